//! Process-wide image cache with coalesced get-or-fetch.
//!
//! Lookup order is memory, then disk, then the fetcher. Concurrent fetches
//! of one URL share a single underlying operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{FetchOutcome, ImageSource, ImageUrl, SharedImage};
use crate::domain::errors::{CacheResult, FetchError};
use crate::domain::ports::ImageFetcherPort;
use crate::infrastructure::config::{CacheConfig, ImageChoiceConfig};

use super::disk_cache::DiskImageCache;
use super::http_fetcher::HttpImageFetcher;
use super::memory_cache::{CacheStats, MemoryImageCache};

type Flight = watch::Receiver<Option<FetchOutcome>>;

/// A running fetch. `id` tells it apart from later flights for the same URL.
#[derive(Clone)]
struct FlightEntry {
    id: u64,
    rx: Flight,
}

/// Shared get-or-fetch cache for decoded images.
///
/// Cloning is cheap; clones share the same storage.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    memory: MemoryImageCache,
    disk: Option<DiskImageCache>,
    fetcher: Arc<dyn ImageFetcherPort>,
    in_flight: Mutex<HashMap<ImageUrl, FlightEntry>>,
    next_flight: AtomicU64,
    max_decode_width: Option<u32>,
    network_fetches: AtomicU64,
    closed: AtomicBool,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("memory", &self.inner.memory.stats())
            .field("disk", &self.inner.disk.is_some())
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

/// Removes the in-flight entry once the flight task ends, even on panic.
///
/// Leaves the map alone if the flight was detached and replaced.
struct FlightGuard {
    inner: Arc<CacheInner>,
    url: ImageUrl,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight.lock();
        if in_flight.get(&self.url).is_some_and(|f| f.id == self.id) {
            in_flight.remove(&self.url);
        }
    }
}

impl ImageCache {
    /// Creates a cache around an arbitrary fetcher.
    #[must_use]
    pub fn new(
        config: &CacheConfig,
        fetcher: Arc<dyn ImageFetcherPort>,
        disk: Option<DiskImageCache>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                memory: MemoryImageCache::new(config.memory_capacity_bytes),
                disk,
                fetcher,
                in_flight: Mutex::new(HashMap::new()),
                next_flight: AtomicU64::new(0),
                max_decode_width: config.max_decode_width,
                network_fetches: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates the application cache: HTTP fetcher plus the configured disk tier.
    ///
    /// # Errors
    /// Returns error if the HTTP client or disk cache cannot be created.
    pub async fn from_config(config: &ImageChoiceConfig) -> CacheResult<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpImageFetcher::new(&config.network)?);
        let disk = if config.cache.disk_enabled {
            Some(
                DiskImageCache::open(
                    config.cache.effective_disk_cache_dir(),
                    config.cache.disk_capacity_bytes,
                )
                .await?,
            )
        } else {
            None
        };
        info!(
            memory_capacity_bytes = config.cache.memory_capacity_bytes,
            disk = disk.is_some(),
            "Image cache created"
        );
        Ok(Self::new(&config.cache, fetcher, disk))
    }

    /// Returns a resident image without blocking, marking it recently used.
    #[must_use]
    pub fn get(&self, url: &ImageUrl) -> Option<SharedImage> {
        self.inner.memory.get(url)
    }

    /// Resolves `url`, fetching and storing it on a miss.
    ///
    /// Never fails: problems resolve to [`FetchOutcome::Unavailable`].
    pub async fn fetch_and_store(&self, url: &ImageUrl) -> FetchOutcome {
        if self.inner.closed.load(Ordering::Acquire) {
            return FetchOutcome::unavailable("image cache is shut down");
        }

        if let Some(image) = self.get(url) {
            return FetchOutcome::Ready {
                image,
                source: ImageSource::MemoryCache,
            };
        }

        match self.join_flight(url) {
            Ok(flight) => wait_for(flight).await,
            Err(outcome) => outcome,
        }
    }

    /// Resolves several URLs concurrently.
    pub async fn prefetch(&self, urls: &[ImageUrl]) -> Vec<FetchOutcome> {
        join_all(urls.iter().map(|url| self.fetch_and_store(url))).await
    }

    /// Drops `url` from memory and disk. No-op if absent.
    ///
    /// A fetch already running still answers its waiters but no longer
    /// stores its result; the next call starts a fresh fetch.
    pub async fn invalidate(&self, url: &ImageUrl) {
        let detached = self.inner.in_flight.lock().remove(url).is_some();
        let removed = self.inner.memory.remove(url);
        if let Some(disk) = &self.inner.disk {
            disk.evict(&url.cache_key()).await;
        }
        debug!(url = %url, resident = removed, detached, "Invalidated image");
    }

    /// Clears memory and disk tiers.
    pub async fn clear(&self) {
        self.inner.memory.clear();
        if let Some(disk) = &self.inner.disk
            && let Err(e) = disk.clear().await
        {
            warn!(error = %e, "Failed to clear disk cache");
        }
        info!("Cleared all image caches");
    }

    /// Stops serving fetches and drops resident images.
    ///
    /// Fetches already running finish for their waiters but are not stored.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.memory.clear();
        self.inner.in_flight.lock().clear();
        info!("Image cache shut down");
    }

    /// Returns true if `url` is resident in memory.
    #[must_use]
    pub fn contains(&self, url: &ImageUrl) -> bool {
        self.inner.memory.contains(url)
    }

    /// Number of URLs currently being fetched.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Number of underlying fetcher calls issued so far.
    #[must_use]
    pub fn network_fetches(&self) -> u64 {
        self.inner.network_fetches.load(Ordering::Relaxed)
    }

    /// Returns memory cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.memory.stats()
    }

    /// Joins the running flight for `url` or starts one.
    ///
    /// `Err` carries an image that landed in memory while we raced for the lock.
    fn join_flight(&self, url: &ImageUrl) -> Result<Flight, FetchOutcome> {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(existing) = in_flight.get(url) {
            trace!(url = %url, "Joining in-flight fetch");
            return Ok(existing.rx.clone());
        }

        // A flight stores to memory before it leaves the map. The caller
        // already counted its miss, so peek rather than get.
        if let Some(entry) = self.inner.memory.peek(url) {
            return Err(FetchOutcome::Ready {
                image: entry.image,
                source: ImageSource::MemoryCache,
            });
        }

        let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        in_flight.insert(
            url.clone(),
            FlightEntry {
                id,
                rx: rx.clone(),
            },
        );
        drop(in_flight);

        let guard = FlightGuard {
            inner: Arc::clone(&self.inner),
            url: url.clone(),
            id,
        };
        tokio::spawn(async move {
            let outcome = guard.inner.resolve(&guard.url, guard.id).await;
            drop(guard);
            let _ = tx.send(Some(outcome));
        });

        Ok(rx)
    }
}

async fn wait_for(mut flight: Flight) -> FetchOutcome {
    loop {
        let current = flight.borrow_and_update().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        if flight.changed().await.is_err() {
            let last = flight.borrow().clone();
            return last
                .unwrap_or_else(|| FetchOutcome::unavailable("fetch ended without a result"));
        }
    }
}

impl CacheInner {
    async fn resolve(&self, url: &ImageUrl, flight: u64) -> FetchOutcome {
        let key = url.cache_key();

        if let Some(disk) = &self.disk
            && let Some(bytes) = disk.get_bytes(&key).await
        {
            match self.decode(Bytes::from(bytes)).await {
                Ok(image) => {
                    debug!(url = %url, source = "disk", "Image loaded");
                    self.store(url, flight, &image);
                    return FetchOutcome::Ready {
                        image,
                        source: ImageSource::DiskCache,
                    };
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Discarding undecodable disk entry");
                    disk.evict(&key).await;
                }
            }
        }

        self.network_fetches.fetch_add(1, Ordering::Relaxed);
        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "Image fetch failed");
                return e.into();
            }
        };

        let image = match self.decode(bytes.clone()).await {
            Ok(image) => image,
            Err(e) => {
                warn!(url = %url, error = %e, "Image decode failed");
                return e.into();
            }
        };

        if self.store(url, flight, &image)
            && let Some(disk) = &self.disk
            && !url.is_local()
        {
            if let Err(e) = disk.put_bytes(&key, &bytes).await {
                warn!(url = %url, error = %e, "Failed to cache to disk");
            } else if !self.is_current(url, flight) {
                // Invalidated while writing.
                disk.evict(&key).await;
            }
        }

        debug!(url = %url, source = "network", "Image loaded");
        FetchOutcome::Ready {
            image,
            source: ImageSource::Network,
        }
    }

    fn is_current(&self, url: &ImageUrl, flight: u64) -> bool {
        self.in_flight
            .lock()
            .get(url)
            .is_some_and(|f| f.id == flight)
    }

    /// Stores the result of `flight` unless it was detached or the cache closed.
    ///
    /// Holds the in-flight lock across the insert so an invalidation cannot
    /// slip between the check and the store.
    fn store(&self, url: &ImageUrl, flight: u64, image: &SharedImage) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let in_flight = self.in_flight.lock();
        if !in_flight.get(url).is_some_and(|f| f.id == flight) {
            debug!(url = %url, "Discarding result of detached fetch");
            return false;
        }
        let evicted = self.memory.insert(url.clone(), Arc::clone(image));
        drop(in_flight);

        if !evicted.is_empty() {
            trace!(url = %url, evicted = evicted.len(), "Made room in memory cache");
        }
        true
    }

    async fn decode(&self, bytes: Bytes) -> Result<SharedImage, FetchError> {
        let max_width = self.max_decode_width;
        let decoded = tokio::task::spawn_blocking(move || -> Result<image::DynamicImage, FetchError> {
            let img = image::load_from_memory(&bytes)
                .map_err(|e| FetchError::decode(format!("Decode failed: {e}")))?;

            match max_width {
                Some(max) if img.width() > max => {
                    Ok(img.resize(max, u32::MAX, image::imageops::FilterType::Lanczos3))
                }
                _ => Ok(img),
            }
        })
        .await
        .map_err(|e| FetchError::task_failed(format!("Decode task panicked: {e}")))??;

        Ok(Arc::new(decoded))
    }
}
