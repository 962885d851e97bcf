//! Error types for the harvest CLI
//!
//! User-facing errors with messages that say what to check next.

use crate::collect::CollectError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Top-level error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check harvest.toml, HARVEST_* environment variables or command-line flags.")]
    Config(String),

    /// Collection from the remote API failed
    #[error("Collection failed: {0}")]
    Collect(#[from] CollectError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Writing a CSV artifact failed
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or parsing failed
    #[error("Failed to process JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse config file: {0}. Check the TOML syntax.")]
    TomlParse(#[from] toml::de::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
