//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ImageChoice, ImageUrl, SharedImage, Slot};
pub use errors::{CacheError, FetchError};
pub use ports::{ImageFetcherPort, ImageSlotTarget};
