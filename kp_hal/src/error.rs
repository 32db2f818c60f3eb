//! HAL error type.

use kp_common::config::ConfigError;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<ConfigError> for HalError {
    fn from(e: ConfigError) -> Self {
        HalError::ConfigError(e.to_string())
    }
}
