//! Error types for schema_diff
//!
//! Parsing and diffing never fail; these errors only come from the I/O layer
//! around them (configuration, reading dumps, logging setup).

use thiserror::Error;

/// Result type for schema_diff operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_diff
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Input '{path}' is {size} bytes, which exceeds the limit of {limit} bytes")]
    InputTooLarge { path: String, size: u64, limit: u64 },

    #[error("Input '{path}' is not valid UTF-8: {message}")]
    EncodingError { path: String, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Convert Serde JSON errors to schema_diff errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_diff errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
