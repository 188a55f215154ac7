//! Infrastructure layer with caching, fetching and configuration adapters.

/// Configuration.
pub mod config;
/// Image fetching, caching and loading.
pub mod image;
/// Tracing setup.
pub mod logging;

pub use config::{CacheConfig, ImageChoiceConfig, LogLevel, LoggingConfig, NetworkConfig};
pub use image::{
    AsyncImageLoader, CacheStats, DiskImageCache, HttpImageFetcher, ImageCache, MemoryImageCache,
    SlotImageEvent,
};
pub use logging::init_logging;
