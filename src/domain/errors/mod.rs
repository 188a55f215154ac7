//! Domain error types.

mod cache_error;
mod config_error;
mod fetch_error;
mod url_error;

pub use cache_error::{CacheError, CacheResult};
pub use config_error::ConfigError;
pub use fetch_error::FetchError;
pub use url_error::ImageUrlError;
