//! Domain types for remote image acquisition.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::Url;

use crate::domain::errors::ImageUrlError;

/// A decoded image shared between the cache and every view displaying it.
pub type SharedImage = Arc<image::DynamicImage>;

/// Schemes the fetcher knows how to resolve.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Validated absolute image URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageUrl(Url);

impl ImageUrl {
    /// Parses and validates an image URL.
    ///
    /// # Errors
    /// Returns error if the input is not an absolute URL or uses a scheme
    /// other than `http`, `https` or `file`.
    pub fn parse(input: &str) -> Result<Self, ImageUrlError> {
        let url = Url::parse(input.trim()).map_err(|e| ImageUrlError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(ImageUrlError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the parsed URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns true for `file://` URLs, which are read from disk rather than fetched.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Returns the cache key derived from this URL.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_url(self.as_str())
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageUrl {
    type Err = ImageUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ImageUrl {
    type Error = ImageUrlError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Filesystem-safe identifier for a cached image.
/// Derived from a hash of the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key by hashing a URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Rebuilds a key from a stored file stem.
    #[must_use]
    pub(crate) fn from_stored(stem: &str) -> Self {
        Self(stem.to_string())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an image was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Resident in the in-memory LRU.
    MemoryCache,
    /// Read back from the persistent tier.
    DiskCache,
    /// Downloaded (or read from a `file://` URL).
    Network,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Result of resolving a URL to an image.
///
/// Failures are a value, not an error: callers fall back to their placeholder.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The image resolved.
    Ready {
        /// Decoded image, shared with the cache.
        image: SharedImage,
        /// Tier that produced it.
        source: ImageSource,
    },
    /// The image could not be produced (network, status, decode or IO failure).
    Unavailable {
        /// Human-readable cause, for logs.
        reason: String,
    },
}

impl FetchOutcome {
    /// Creates an unavailable outcome.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns the image if resolved.
    #[must_use]
    pub const fn image(&self) -> Option<&SharedImage> {
        match self {
            Self::Ready { image, .. } => Some(image),
            Self::Unavailable { .. } => None,
        }
    }

    /// Returns true if the image resolved.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

impl From<crate::domain::errors::FetchError> for FetchOutcome {
    fn from(err: crate::domain::errors::FetchError) -> Self {
        Self::unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://x/a.png" ; "https")]
    #[test_case("http://example.com/img/b.jpg?w=200" ; "http with query")]
    #[test_case("file:///usr/share/survey/c.png" ; "local file")]
    fn test_accepts_supported_urls(input: &str) {
        assert!(ImageUrl::parse(input).is_ok());
    }

    #[test_case("not a url" ; "garbage")]
    #[test_case("/relative/path.png" ; "relative")]
    #[test_case("" ; "empty")]
    fn test_rejects_malformed_urls(input: &str) {
        assert!(matches!(
            ImageUrl::parse(input),
            Err(ImageUrlError::Malformed { .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let err = ImageUrl::parse("ftp://example.com/a.png").unwrap_err();
        assert_eq!(
            err,
            ImageUrlError::UnsupportedScheme {
                scheme: "ftp".to_string()
            }
        );
    }

    #[test]
    fn test_cache_key_is_stable_and_hex() {
        let url = ImageUrl::parse("https://x/a.png").unwrap();
        let k1 = url.cache_key();
        let k2 = CacheKey::from_url("https://x/a.png");
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 32);
        assert!(k1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_urls_have_distinct_keys() {
        let a = ImageUrl::parse("https://x/a.png").unwrap();
        let b = ImageUrl::parse("https://x/b.png").unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_outcome_from_error_is_unavailable() {
        let outcome = FetchOutcome::from(crate::domain::errors::FetchError::status(500, "boom"));
        assert!(!outcome.is_ready());
        assert!(outcome.image().is_none());
    }
}
