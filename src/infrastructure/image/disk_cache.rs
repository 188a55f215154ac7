//! Disk-based persistence of fetched image bytes.

use std::path::{Path, PathBuf};

use lru::LruCache;
use parking_lot::Mutex;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

const ENTRY_EXTENSION: &str = "img";
const TEMP_EXTENSION: &str = "tmp";

/// Size index of the files on disk, least recently used first.
struct DiskIndex {
    entries: LruCache<CacheKey, u64>,
    total_bytes: u64,
}

/// Disk cache storing raw (still encoded) image bytes under `<key>.img`.
///
/// When the size limit is exceeded, least recently used files are removed
/// until the cache is back under 90% of the limit.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    max_bytes: u64,
    index: Mutex<DiskIndex>,
}

impl DiskImageCache {
    /// Opens (creating if needed) a disk cache in `cache_dir`.
    ///
    /// Existing entries are indexed oldest-modified first. Temp files left
    /// by interrupted writes are removed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or listed.
    pub async fn open(cache_dir: PathBuf, max_bytes: u64) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;

        let mut found: Vec<(CacheKey, std::time::SystemTime, u64)> = Vec::new();
        let mut dir = fs::read_dir(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        let mut swept = 0usize;
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if is_temp_file(&path) {
                match fs::remove_file(&path).await {
                    Ok(()) => swept += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove stale temp file");
                    }
                }
                continue;
            }
            let Some(key) = key_from_path(&path) else {
                continue;
            };
            if let Ok(meta) = entry.metadata().await {
                let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                found.push((key, modified, meta.len()));
            }
        }
        found.sort_by_key(|(_, modified, _)| *modified);

        let mut index = DiskIndex {
            entries: LruCache::unbounded(),
            total_bytes: 0,
        };
        for (key, _, size) in found {
            index.total_bytes += size;
            index.entries.put(key, size);
        }

        debug!(
            dir = %cache_dir.display(),
            entries = index.entries.len(),
            total_bytes = index.total_bytes,
            swept,
            "Opened disk image cache"
        );

        let cache = Self {
            cache_dir,
            max_bytes,
            index: Mutex::new(index),
        };
        cache.cleanup_if_needed().await;
        Ok(cache)
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    /// Reads cached bytes, marking the entry recently used.
    pub async fn get_bytes(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if !self.index.lock().entries.contains(key) {
            trace!(key = %key, "Disk cache miss");
            return None;
        }

        let path = self.entry_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                self.index.lock().entries.promote(key);
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Some(bytes)
            }
            Err(e) => {
                // Removed behind our back; drop it from the index.
                debug!(key = %key, error = %e, "Indexed disk entry unreadable");
                self.forget(key);
                None
            }
        }
    }

    /// Stores bytes, replacing any previous entry for `key`.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub async fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(key);
        let tmp_path = self
            .cache_dir
            .join(format!(
                "{}.{}.{TEMP_EXTENSION}",
                key.as_str(),
                uuid::Uuid::new_v4()
            ));

        fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to write cache file: {e}")))?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(CacheError::IoError(format!(
                "Failed to move cache file into place: {e}"
            )));
        }

        let size = bytes.len() as u64;
        {
            let mut index = self.index.lock();
            if let Some(old) = index.entries.put(key.clone(), size) {
                index.total_bytes -= old;
            }
            index.total_bytes += size;
        }

        debug!(key = %key, size, "Stored image bytes in disk cache");
        self.cleanup_if_needed().await;
        Ok(())
    }

    /// Removes an entry if present.
    pub async fn evict(&self, key: &CacheKey) {
        if !self.forget(key) {
            return;
        }
        let path = self.entry_path(key);
        if let Err(e) = fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(key = %key, error = %e, "Failed to evict from disk cache");
        } else {
            debug!(key = %key, "Evicted from disk cache");
        }
    }

    /// Removes every entry.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be listed.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut dir = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if key_from_path(&path).is_some() && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }

        let mut index = self.index.lock();
        index.entries.clear();
        index.total_bytes = 0;
        debug!("Cleared disk cache");
        Ok(())
    }

    /// Returns true if `key` is indexed.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.index.lock().entries.contains(key)
    }

    /// Total bytes on disk.
    pub fn current_size(&self) -> u64 {
        self.index.lock().total_bytes
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&self, key: &CacheKey) -> bool {
        let mut index = self.index.lock();
        if let Some(size) = index.entries.pop(key) {
            index.total_bytes -= size;
            true
        } else {
            false
        }
    }

    async fn cleanup_if_needed(&self) {
        let victims = {
            let mut index = self.index.lock();
            if index.total_bytes <= self.max_bytes {
                return;
            }

            let target = self.max_bytes - self.max_bytes / 10;
            debug!(
                total_bytes = index.total_bytes,
                max_bytes = self.max_bytes,
                "Disk cache over limit, cleaning up"
            );

            let mut victims = Vec::new();
            while index.total_bytes > target {
                let Some((key, size)) = index.entries.pop_lru() else {
                    break;
                };
                index.total_bytes -= size;
                victims.push(key);
            }
            victims
        };

        let count = victims.len();
        for key in victims {
            let path = self.entry_path(&key);
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            }
        }
        debug!(removed = count, "Disk cache cleanup complete");
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMP_EXTENSION)
}

fn key_from_path(path: &Path) -> Option<CacheKey> {
    if path.extension().is_none_or(|ext| ext != ENTRY_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Some(CacheKey::from_stored(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_url(&format!("https://x/{name}.png"))
    }

    async fn create_test_cache(max_bytes: u64) -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(temp_dir.path().to_path_buf(), max_bytes)
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get_bytes() {
        let (cache, _temp) = create_test_cache(1024).await;

        cache.put_bytes(&key("a"), b"png bytes").await.unwrap();

        assert_eq!(cache.get_bytes(&key("a")).await.unwrap(), b"png bytes");
        assert!(cache.get_bytes(&key("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_size_accounting() {
        let (cache, _temp) = create_test_cache(1024).await;

        cache.put_bytes(&key("1"), b"hello").await.unwrap();
        cache.put_bytes(&key("2"), b"world!").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 11);

        cache.put_bytes(&key("1"), b"hey").await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_size(), 9);

        cache.evict(&key("2")).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_size(), 3);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_least_recent() {
        let (cache, _temp) = create_test_cache(10).await;

        cache.put_bytes(&key("old"), b"123456").await.unwrap();
        cache.put_bytes(&key("new"), b"123456").await.unwrap();

        assert!(!cache.contains(&key("old")));
        assert!(cache.contains(&key("new")));
        assert_eq!(cache.current_size(), 6);
    }

    #[tokio::test]
    async fn test_read_promotes_entry() {
        let (cache, _temp) = create_test_cache(14).await;

        cache.put_bytes(&key("1"), b"1234").await.unwrap();
        cache.put_bytes(&key("2"), b"1234").await.unwrap();
        cache.put_bytes(&key("3"), b"1234").await.unwrap();
        let _ = cache.get_bytes(&key("1")).await;
        cache.put_bytes(&key("4"), b"1234").await.unwrap();

        assert!(cache.contains(&key("1")));
        assert!(!cache.contains(&key("2")));
    }

    #[tokio::test]
    async fn test_reopen_restores_index() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = DiskImageCache::open(temp_dir.path().to_path_buf(), 1024)
                .await
                .unwrap();
            cache.put_bytes(&key("persisted"), b"abc").await.unwrap();
        }

        let reopened = DiskImageCache::open(temp_dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.get_bytes(&key("persisted")).await.unwrap(),
            b"abc"
        );
    }

    #[tokio::test]
    async fn test_open_sweeps_interrupted_writes() {
        let temp_dir = TempDir::new().unwrap();
        let stale = temp_dir
            .path()
            .join(format!("{}.{}.tmp", key("a").as_str(), uuid::Uuid::new_v4()));
        let unrelated = temp_dir.path().join("notes.txt");
        std::fs::write(&stale, b"half written").unwrap();
        std::fs::write(&unrelated, b"keep me").unwrap();

        let cache = DiskImageCache::open(temp_dir.path().to_path_buf(), 1024)
            .await
            .unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
    }

    #[tokio::test]
    async fn test_evict_missing_is_noop() {
        let (cache, _temp) = create_test_cache(1024).await;
        cache.evict(&key("nothing")).await;
        assert!(cache.is_empty());
    }
}
