//! Port for retrieving raw image bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::ImageUrl;
use crate::domain::errors::FetchError;

/// Port for the underlying fetch primitive.
/// Implementations must be thread-safe; one call is one network operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcherPort: Send + Sync {
    /// Retrieves the encoded bytes behind `url`.
    async fn fetch(&self, url: &ImageUrl) -> Result<Bytes, FetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    /// Encodes a solid image as PNG bytes.
    pub fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("encode test png");
        Bytes::from(buf.into_inner())
    }

    /// Scriptable fetcher that counts calls and can hold a URL until released.
    #[derive(Default)]
    pub struct StubFetcher {
        responses: Mutex<HashMap<String, Result<Bytes, FetchError>>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl StubFetcher {
        /// Creates a fetcher with no scripted responses; unknown URLs 404.
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts a successful PNG response.
        pub fn respond_png(&self, url: &str, width: u32, height: u32) {
            self.responses
                .lock()
                .insert(url.to_string(), Ok(png_bytes(width, height)));
        }

        /// Scripts a raw response.
        pub fn respond(&self, url: &str, response: Result<Bytes, FetchError>) {
            self.responses.lock().insert(url.to_string(), response);
        }

        /// Makes fetches of `url` wait until [`Self::release`] is called.
        pub fn hold(&self, url: &str) {
            self.gates
                .lock()
                .insert(url.to_string(), Arc::new(Notify::new()));
        }

        /// Lets every held fetch of `url` proceed.
        pub fn release(&self, url: &str) {
            if let Some(gate) = self.gates.lock().remove(url) {
                gate.notify_waiters();
                // Covers a fetch that took the gate but has not parked yet.
                gate.notify_one();
            }
        }

        /// Number of underlying fetches issued for `url`.
        pub fn calls(&self, url: &str) -> usize {
            self.calls.lock().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ImageFetcherPort for StubFetcher {
        async fn fetch(&self, url: &ImageUrl) -> Result<Bytes, FetchError> {
            *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;

            let gate = self.gates.lock().get(url.as_str()).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            self.responses
                .lock()
                .get(url.as_str())
                .cloned()
                .unwrap_or_else(|| Err(FetchError::status(404, "Not Found")))
        }
    }
}
