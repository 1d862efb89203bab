//! Config check command
//!
//! Loads every settings layer, validates the result and prints the
//! effective settings as YAML.

use nodepool_config::{Settings, SettingsBuilder};
use std::io::Write;
use std::path::Path;

use crate::error::CliResult;

/// Resolve settings from defaults, an optional file and the environment.
pub fn load(file: Option<&Path>) -> CliResult<Settings> {
    let mut builder = SettingsBuilder::new();
    if let Some(path) = file {
        builder = builder.with_file(path);
    }
    if Path::new(".env").is_file() {
        builder = builder.with_dotenv(".env");
    }
    Ok(builder.build()?)
}

pub fn check<W: Write>(out: &mut W, settings: &Settings) -> CliResult<()> {
    tracing::info!(
        namespace = %settings.lease.namespace,
        ttl_seconds = settings.lease.ttl_seconds,
        "Configuration is valid"
    );
    let yaml = serde_yaml::to_string(settings)?;
    write!(out, "{}", yaml)?;
    Ok(())
}
