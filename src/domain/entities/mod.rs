//! Domain entity definitions.

mod image;
mod image_choice;
mod slot;
mod view_id;

pub use image::{CacheKey, FetchOutcome, ImageSource, ImageUrl, SharedImage};
pub use image_choice::{ChoiceValue, ImageChoice, ImageChoiceBuilder, make_image_choice};
pub use slot::{Generation, Slot, SlotBinding, SlotPhase};
pub use view_id::ViewId;
