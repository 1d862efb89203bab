//! Configuration for the node-pool manager
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. an optional JSON / TOML / YAML file
//! 3. an optional `.env` file
//! 4. process environment (`NODEPOOL_<SECTION>_<KEY>`)
//! 5. explicit overrides set on the builder
//!
//! ```rust
//! use nodepool_config::SettingsBuilder;
//!
//! let settings = SettingsBuilder::new()
//!     .without_env()
//!     .set("lease.namespace", "kube-system")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(settings.lease.namespace, "kube-system");
//! assert_eq!(settings.lease.ttl_seconds, 15);
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, merge_values};
pub use validation::{ConfigValidator, Validate};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Log levels accepted by `log.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Output formats accepted by `log.format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Lease defaults used by lock callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseSettings {
    pub namespace: String,
    pub holder_identity: String,
    pub ttl_seconds: u32,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            holder_identity: "nodepool-manager".to_string(),
            ttl_seconds: 15,
        }
    }
}

impl LeaseSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerSettings {
    pub color: bool,
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Cluster connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeSettings {
    /// Server version answered by the static discovery source; empty means
    /// discovery is unavailable.
    pub server_version: String,
}

/// Effective settings of the node-pool manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lease: LeaseSettings,
    pub banner: BannerSettings,
    pub log: LogSettings,
    pub kube: KubeSettings,
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.lease.namespace, "lease.namespace")?;
        ConfigValidator::not_empty(&self.lease.holder_identity, "lease.holder_identity")?;
        ConfigValidator::in_range(self.lease.ttl_seconds, 1, i32::MAX as u32, "lease.ttl_seconds")?;
        ConfigValidator::one_of(&self.log.level, LOG_LEVELS, "log.level")?;
        ConfigValidator::one_of(&self.log.format, LOG_FORMATS, "log.format")?;
        Ok(())
    }
}

/// Builds [`Settings`] from the configured layers.
pub struct SettingsBuilder {
    file: Option<PathBuf>,
    dotenv: Option<PathBuf>,
    env: Option<EnvLoader>,
    overrides: Vec<(String, Value)>,
}

impl SettingsBuilder {
    /// Defaults plus the `NODEPOOL_` environment.
    pub fn new() -> Self {
        Self {
            file: None,
            dotenv: None,
            env: Some(EnvLoader::default()),
            overrides: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Read environment variables with a different prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env = Some(EnvLoader::new(Some(prefix.into())));
        self
    }

    /// Ignore the process environment.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Override one dotted key, e.g. `lease.ttl_seconds`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Resolve every layer, deserialize and validate.
    pub fn build(self) -> Result<Settings> {
        let mut document = serde_json::to_value(Settings::default())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        if let Some(path) = &self.file {
            let overlay = ConfigLoader::auto(path)?.load_file(path)?;
            merge_values(&mut document, overlay);
        }

        let env_loader = self.env.as_ref();
        if let Some(path) = &self.dotenv {
            let default_loader = EnvLoader::default();
            let loader = env_loader.unwrap_or(&default_loader);
            let mut pairs = Vec::new();
            for item in dotenvy::from_path_iter(path)? {
                pairs.push(item?);
            }
            apply_flat(&mut document, loader.collect(pairs))?;
        }

        if let Some(loader) = env_loader {
            apply_flat(&mut document, loader.load())?;
        }

        for (key, value) in self.overrides {
            let (section, field) = key.split_once('.').ok_or_else(|| {
                ConfigError::LoadError(format!("Override key must be <section>.<field>: {}", key))
            })?;
            set_field(&mut document, section, field, value);
        }

        let settings: Settings = serde_json::from_value(document)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply flat `section_field` keys whose section exists in `document`.
fn apply_flat(document: &mut Value, flat: HashMap<String, String>) -> Result<()> {
    for (key, raw) in flat {
        let Some((section, field)) = key.split_once('_') else {
            continue;
        };
        let Some(existing) = document.get(section).filter(|v| v.is_object()) else {
            continue;
        };
        let value = coerce(existing.get(field), &raw).map_err(|e| {
            ConfigError::ParseError(format!("{}.{}: {}", section, field, e))
        })?;
        set_field(document, section, field, value);
    }
    Ok(())
}

/// Interpret a string in the type of the value it replaces.
fn coerce(existing: Option<&Value>, raw: &str) -> std::result::Result<Value, String> {
    match existing {
        Some(Value::Bool(_)) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("expected a boolean, got {:?}", raw)),
        },
        Some(Value::Number(_)) => raw
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| format!("expected a number, got {:?}", raw)),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn set_field(document: &mut Value, section: &str, field: &str, value: Value) {
    if let Value::Object(root) = document {
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(map) = entry {
            map.insert(field.to_string(), value);
        }
    }
}
