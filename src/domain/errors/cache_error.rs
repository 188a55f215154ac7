//! Cache construction and maintenance errors.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised while building or maintaining the image cache.
///
/// Lookups and fetches never return these; see
/// [`FetchOutcome`](crate::domain::entities::FetchOutcome).
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// I/O error in the persistent tier.
    #[error("IO error: {0}")]
    IoError(String),
    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] super::ConfigError),
}
