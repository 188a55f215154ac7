mod image_fetcher_port;
mod image_slot_target;

pub use image_fetcher_port::ImageFetcherPort;
pub use image_slot_target::ImageSlotTarget;

#[cfg(test)]
pub mod mocks {
    pub use super::image_fetcher_port::MockImageFetcherPort;
    pub use super::image_fetcher_port::mock::{StubFetcher, png_bytes};
}
