//! HTTP fetch primitive backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::domain::entities::ImageUrl;
use crate::domain::errors::{CacheError, CacheResult, FetchError};
use crate::domain::ports::ImageFetcherPort;
use crate::infrastructure::config::NetworkConfig;

/// Fetches image bytes over HTTP(S), or from disk for `file://` URLs.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher with the given network settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &NetworkConfig) -> CacheResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CacheError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &ImageUrl) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url.as_url().clone())
            .send()
            .await
            .map_err(|e| FetchError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        trace!(url = %url, content_type = ?content_type, "Response headers received");

        response
            .bytes()
            .await
            .map_err(|e| FetchError::network(format!("Failed to read body: {e}")))
    }

    async fn read_local(url: &ImageUrl) -> Result<Bytes, FetchError> {
        let path = url
            .as_url()
            .to_file_path()
            .map_err(|()| FetchError::io(format!("Not a local path: {url}")))?;
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| FetchError::io(format!("Failed to read {}: {e}", path.display())))
    }
}

#[async_trait]
impl ImageFetcherPort for HttpImageFetcher {
    async fn fetch(&self, url: &ImageUrl) -> Result<Bytes, FetchError> {
        debug!(url = %url, "Fetching image");
        if url.is_local() {
            Self::read_local(url).await
        } else {
            self.download(url).await
        }
    }
}
