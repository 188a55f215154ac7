//! In-memory LRU image cache bounded by decoded size.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, ImageUrl, SharedImage};

/// A decoded image resident in memory.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// URL the entry is keyed by.
    pub url: ImageUrl,
    /// Hashed key naming the same image in the disk cache.
    pub disk_key: CacheKey,
    /// Decoded image.
    pub image: SharedImage,
    /// Decoded pixel buffer size.
    pub size_bytes: usize,
    /// Last insert or promoting read.
    pub last_access: DateTime<Utc>,
}

struct Residency {
    entries: LruCache<ImageUrl, CacheEntry>,
    resident_bytes: usize,
}

/// In-memory LRU cache for decoded images.
///
/// Total resident bytes never exceed the capacity after an insert. Reads
/// promote but never evict.
pub struct MemoryImageCache {
    state: Mutex<Residency>,
    capacity_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Decoded size of an image in bytes.
#[must_use]
pub fn decoded_size(image: &image::DynamicImage) -> usize {
    image.as_bytes().len()
}

impl MemoryImageCache {
    /// Creates a new cache holding at most `capacity_bytes` of decoded pixels.
    #[must_use]
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            state: Mutex::new(Residency {
                entries: LruCache::unbounded(),
                resident_bytes: 0,
            }),
            capacity_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the configured byte budget.
    #[must_use]
    pub const fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    /// Gets an image and marks it most recently used.
    pub fn get(&self, url: &ImageUrl) -> Option<SharedImage> {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(url) {
            entry.last_access = Utc::now();
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache hit");
            Some(entry.image.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache miss");
            None
        }
    }

    /// Peeks at an entry without promoting it.
    pub fn peek(&self, url: &ImageUrl) -> Option<CacheEntry> {
        self.state.lock().entries.peek(url).cloned()
    }

    /// Stores an image, evicting least recently used entries until it fits.
    ///
    /// An image larger than the whole budget is not retained. Returns the
    /// URLs evicted to make room.
    pub fn insert(&self, url: ImageUrl, image: SharedImage) -> Vec<ImageUrl> {
        let size_bytes = decoded_size(&image);
        let mut state = self.state.lock();

        if let Some(old) = state.entries.pop(&url) {
            state.resident_bytes -= old.size_bytes;
        }

        if size_bytes > self.capacity_bytes {
            debug!(
                url = %url,
                size_bytes,
                capacity_bytes = self.capacity_bytes,
                "Image exceeds memory cache capacity, not retained"
            );
            return Vec::new();
        }

        let mut evicted = Vec::new();
        while state.resident_bytes + size_bytes > self.capacity_bytes {
            let Some((old_url, old)) = state.entries.pop_lru() else {
                break;
            };
            state.resident_bytes -= old.size_bytes;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(url = %old_url, size_bytes = old.size_bytes, "Evicted image from memory cache");
            evicted.push(old_url);
        }

        let entry = CacheEntry {
            disk_key: url.cache_key(),
            url: url.clone(),
            image,
            size_bytes,
            last_access: Utc::now(),
        };
        debug!(url = %url, size_bytes, "Storing image in memory cache");
        state.resident_bytes += size_bytes;
        state.entries.put(url, entry);

        evicted
    }

    /// Removes an entry if present.
    pub fn remove(&self, url: &ImageUrl) -> bool {
        let mut state = self.state.lock();
        if let Some(old) = state.entries.pop(url) {
            state.resident_bytes -= old.size_bytes;
            debug!(url = %url, "Removed image from memory cache");
            true
        } else {
            false
        }
    }

    /// Returns true if `url` is resident.
    pub fn contains(&self, url: &ImageUrl) -> bool {
        self.state.lock().entries.contains(url)
    }

    /// Number of resident images.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total decoded bytes resident.
    pub fn resident_bytes(&self) -> usize {
        self.state.lock().resident_bytes
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.resident_bytes = 0;
        debug!("Cleared memory image cache");
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let state = self.state.lock();
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            entries: state.entries.len(),
            resident_bytes: state.resident_bytes,
        }
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Entries evicted for capacity.
    pub evictions: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub entries: usize,
    /// Current decoded bytes resident.
    pub resident_bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses, {} evictions)",
            self.entries,
            self.resident_bytes,
            self.hit_rate,
            self.hits,
            self.misses,
            self.evictions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // 10x10 RGB8 = 300 bytes.
    const TILE_BYTES: usize = 300;

    fn tile() -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(10, 10))
    }

    fn url(name: &str) -> ImageUrl {
        ImageUrl::parse(&format!("https://x/{name}.png")).unwrap()
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = MemoryImageCache::new(10 * TILE_BYTES);
        let img = tile();

        cache.insert(url("a"), img.clone());
        let retrieved = cache.get(&url("a")).unwrap();

        assert!(Arc::ptr_eq(&retrieved, &img));
        assert_eq!(cache.resident_bytes(), TILE_BYTES);
    }

    #[test]
    fn test_entry_is_keyed_by_url() {
        let cache = MemoryImageCache::new(TILE_BYTES);
        cache.insert(url("a"), tile());

        let entry = cache.peek(&url("a")).unwrap();
        assert_eq!(entry.url, url("a"));
        assert_eq!(entry.disk_key, url("a").cache_key());
        assert_eq!(entry.size_bytes, TILE_BYTES);
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new(TILE_BYTES);
        assert!(cache.get(&url("nonexistent")).is_none());
    }

    #[test]
    fn test_eviction_by_size() {
        let cache = MemoryImageCache::new(2 * TILE_BYTES);

        cache.insert(url("1"), tile());
        cache.insert(url("2"), tile());
        let evicted = cache.insert(url("3"), tile());

        assert_eq!(evicted, vec![url("1")]);
        assert!(cache.peek(&url("1")).is_none());
        assert!(cache.contains(&url("2")));
        assert!(cache.contains(&url("3")));
        assert!(cache.resident_bytes() <= cache.capacity_bytes());
    }

    #[test]
    fn test_get_postpones_eviction() {
        let cache = MemoryImageCache::new(2 * TILE_BYTES);

        cache.insert(url("1"), tile());
        cache.insert(url("2"), tile());

        let _ = cache.get(&url("1"));
        cache.insert(url("3"), tile());

        assert!(cache.contains(&url("1")));
        assert!(!cache.contains(&url("2")));
    }

    #[test]
    fn test_get_never_evicts() {
        let cache = MemoryImageCache::new(2 * TILE_BYTES);
        cache.insert(url("1"), tile());
        cache.insert(url("2"), tile());

        for _ in 0..5 {
            let _ = cache.get(&url("1"));
            let _ = cache.get(&url("2"));
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(2 * TILE_BYTES);

        cache.insert(url("1"), tile());
        cache.insert(url("2"), tile());

        let _ = cache.peek(&url("1"));
        cache.insert(url("3"), tile());

        assert!(cache.peek(&url("1")).is_none());
    }

    #[test]
    fn test_get_updates_last_access() {
        let cache = MemoryImageCache::new(TILE_BYTES);
        cache.insert(url("1"), tile());
        let before = cache.peek(&url("1")).unwrap().last_access;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let _ = cache.get(&url("1"));

        let after = cache.peek(&url("1")).unwrap().last_access;
        assert!(after > before);
    }

    #[test]
    fn test_oversized_image_not_retained() {
        let cache = MemoryImageCache::new(TILE_BYTES);
        cache.insert(url("small"), tile());

        let big = Arc::new(image::DynamicImage::new_rgb8(100, 100));
        let evicted = cache.insert(url("big"), big);

        assert!(evicted.is_empty());
        assert!(!cache.contains(&url("big")));
        assert!(cache.contains(&url("small")));
    }

    #[test]
    fn test_reinsert_replaces_accounting() {
        let cache = MemoryImageCache::new(4 * TILE_BYTES);
        cache.insert(url("1"), tile());
        cache.insert(url("1"), tile());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.resident_bytes(), TILE_BYTES);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryImageCache::new(4 * TILE_BYTES);
        cache.insert(url("1"), tile());
        cache.insert(url("2"), tile());

        assert!(cache.remove(&url("1")));
        assert!(!cache.remove(&url("1")));
        assert_eq!(cache.resident_bytes(), TILE_BYTES);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.resident_bytes(), 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(4 * TILE_BYTES);
        cache.insert(url("1"), tile());

        let _ = cache.get(&url("1"));
        let _ = cache.get(&url("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
    }
}
