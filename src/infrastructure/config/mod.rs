//! Configuration.

pub mod app_config;

pub use app_config::{CacheConfig, ImageChoiceConfig, LogLevel, LoggingConfig, NetworkConfig};
