//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with size-bounded LRU eviction
//! - Disk caching for persistence
//! - HTTP fetching
//! - Coalesced get-or-fetch cache and the per-slot async loader

pub mod disk_cache;
pub mod http_fetcher;
pub mod image_cache;
pub mod loader;
pub mod memory_cache;

pub use disk_cache::DiskImageCache;
pub use http_fetcher::HttpImageFetcher;
pub use image_cache::ImageCache;
pub use loader::{AsyncImageLoader, SlotImageEvent};
pub use memory_cache::{CacheEntry, CacheStats, MemoryImageCache};
