//! Error types for the nodepool CLI.

use std::fmt;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug)]
pub enum CliError {
    /// IO error writing output
    Io(std::io::Error),

    /// Settings could not be loaded or failed validation
    Config(String),

    /// Output rendering failed
    Render(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<nodepool_config::ConfigError> for CliError {
    fn from(e: nodepool_config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<nodepool_version::VersionError> for CliError {
    fn from(e: nodepool_version::VersionError) -> Self {
        match e {
            nodepool_version::VersionError::Io(io) => CliError::Io(io),
            other => CliError::Render(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        CliError::Render(e.to_string())
    }
}
