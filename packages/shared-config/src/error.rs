//! Configuration error types

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid value for environment variable
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    /// Malformed entry in the UI account list
    #[error("invalid account entry '{0}': expected user:password")]
    InvalidAccount(String),

    /// Configuration validation error
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
