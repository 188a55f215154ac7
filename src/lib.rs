//! Remote Image Choice - image choice buttons backed by remote images.
//!
//! This crate provides an image choice descriptor, a shared two-tier image
//! cache with coalesced fetches, an asynchronous slot loader with stale
//! completion suppression, and a ratatui choice button widget.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the cache, loader, and config adapters.
pub mod infrastructure;
/// Presentation layer containing the button widgets.
pub mod presentation;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "remote-image-choice";

pub use domain::entities::{
    ChoiceValue, FetchOutcome, ImageChoice, ImageUrl, SharedImage, Slot, make_image_choice,
};
pub use infrastructure::config::ImageChoiceConfig;
pub use infrastructure::image::{AsyncImageLoader, ImageCache, SlotImageEvent};
pub use infrastructure::init_logging;
pub use presentation::ChoiceButtonView;
