//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to parse config: {message}")]
    Parse { message: String },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Creates invalid value error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
