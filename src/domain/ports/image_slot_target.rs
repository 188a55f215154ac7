//! Port implemented by views whose image slots the loader drives.

use crate::domain::entities::{FetchOutcome, Generation, ImageUrl, SharedImage, Slot, ViewId};

/// A view owning independently bindable image slots.
///
/// All methods run on the UI-owning thread.
pub trait ImageSlotTarget {
    /// Identifier used to route completions back to this view.
    fn target_id(&self) -> ViewId;

    /// Starts a new generation for `slot` and displays `placeholder` now.
    fn begin_binding(
        &mut self,
        slot: Slot,
        url: ImageUrl,
        placeholder: Option<SharedImage>,
    ) -> Generation;

    /// Applies a resolution; returns false if `generation` is stale.
    fn complete_binding(
        &mut self,
        slot: Slot,
        generation: Generation,
        outcome: &FetchOutcome,
    ) -> bool;

    /// Invalidates the current generation of `slot` without a new request.
    fn cancel_binding(&mut self, slot: Slot) -> Generation;
}
