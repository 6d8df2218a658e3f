//! Error types for arraybind drivers

use thiserror::Error;

/// Core error type for connection and driver operations
#[derive(Error, Debug)]
pub enum ArraybindError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, ArraybindError>;
