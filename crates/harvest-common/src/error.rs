//! Error types shared across harvest crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Main error type for shared record utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A dotted key is used both as a leaf value and as a parent object
    #[error("Key collision while rebuilding record: '{0}' is both a value and an object")]
    KeyCollision(String),
}
