//! Binds view slots to URLs and routes resolved images back to the UI thread.
//!
//! Fetches run on the Tokio runtime; completions travel over an mpsc channel
//! whose receiver the UI owner drains, applying each event with
//! [`AsyncImageLoader::dispatch`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::entities::{
    FetchOutcome, Generation, ImageSource, ImageUrl, SharedImage, Slot, ViewId,
};
use crate::domain::ports::ImageSlotTarget;

use super::image_cache::ImageCache;

/// Completion of one slot binding, delivered to the UI thread.
#[derive(Debug, Clone)]
pub struct SlotImageEvent {
    /// View that issued the binding.
    pub view: ViewId,
    /// Slot the binding belongs to.
    pub slot: Slot,
    /// Generation captured at bind time.
    pub generation: Generation,
    /// URL that was resolved.
    pub url: ImageUrl,
    /// Resolved image or the unavailable signal.
    pub outcome: FetchOutcome,
}

/// Orchestrates one fetch per (view, slot) binding.
///
/// Stale completions are suppressed by generation rather than cancelled, so
/// a coalesced fetch still serves every other view waiting on it.
#[derive(Clone)]
pub struct AsyncImageLoader {
    cache: ImageCache,
    event_tx: mpsc::UnboundedSender<SlotImageEvent>,
    runtime: Handle,
    pending: Arc<AtomicUsize>,
}

impl std::fmt::Debug for AsyncImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncImageLoader")
            .field("cache", &self.cache)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl AsyncImageLoader {
    /// Creates a loader spawning onto the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(cache: ImageCache, event_tx: &mpsc::UnboundedSender<SlotImageEvent>) -> Self {
        Self::with_runtime(cache, event_tx, Handle::current())
    }

    /// Creates a loader spawning onto an explicit runtime, for UI threads
    /// that live outside it.
    #[must_use]
    pub fn with_runtime(
        cache: ImageCache,
        event_tx: &mpsc::UnboundedSender<SlotImageEvent>,
        runtime: Handle,
    ) -> Self {
        Self {
            cache,
            event_tx: event_tx.clone(),
            runtime,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a loader together with the receiver the UI thread drains.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn channel(cache: ImageCache) -> (Self, mpsc::UnboundedReceiver<SlotImageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(cache, &tx), rx)
    }

    /// Shows `placeholder` in `slot` now and resolves `url` in the background.
    ///
    /// A resident image is applied immediately without a round trip.
    pub fn bind<T>(
        &self,
        target: &mut T,
        slot: Slot,
        url: ImageUrl,
        placeholder: Option<SharedImage>,
    ) -> Generation
    where
        T: ImageSlotTarget + ?Sized,
    {
        let view = target.target_id();
        let generation = target.begin_binding(slot, url.clone(), placeholder);

        if let Some(image) = self.cache.get(&url) {
            trace!(view = %view, slot = %slot, url = %url, "Bound from memory");
            target.complete_binding(
                slot,
                generation,
                &FetchOutcome::Ready {
                    image,
                    source: ImageSource::MemoryCache,
                },
            );
            return generation;
        }

        debug!(view = %view, slot = %slot, generation = %generation, url = %url, "Binding slot");

        let cache = self.cache.clone();
        let tx = self.event_tx.clone();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::AcqRel);

        self.runtime.spawn(async move {
            let outcome = cache.fetch_and_store(&url).await;
            pending.fetch_sub(1, Ordering::AcqRel);

            let event = SlotImageEvent {
                view,
                slot,
                generation,
                url,
                outcome,
            };
            if tx.send(event).is_err() {
                trace!(view = %view, slot = %slot, "UI receiver gone, dropping completion");
            }
        });

        generation
    }

    /// Suppresses any outstanding completion for `slot` without a new request.
    pub fn unbind<T>(&self, target: &mut T, slot: Slot) -> Generation
    where
        T: ImageSlotTarget + ?Sized,
    {
        let generation = target.cancel_binding(slot);
        trace!(view = %target.target_id(), slot = %slot, generation = %generation, "Unbound slot");
        generation
    }

    /// Unbinds both slots.
    pub fn unbind_all<T>(&self, target: &mut T)
    where
        T: ImageSlotTarget + ?Sized,
    {
        for slot in Slot::ALL {
            self.unbind(target, slot);
        }
    }

    /// Applies a completion to its view. Call on the UI thread.
    ///
    /// Returns false for events addressed to another view or carrying a
    /// stale generation.
    pub fn dispatch<T>(event: &SlotImageEvent, target: &mut T) -> bool
    where
        T: ImageSlotTarget + ?Sized,
    {
        if event.view != target.target_id() {
            return false;
        }
        let applied = target.complete_binding(event.slot, event.generation, &event.outcome);
        if !applied {
            trace!(
                view = %event.view,
                slot = %event.slot,
                generation = %event.generation,
                "Suppressed stale completion"
            );
        }
        applied
    }

    /// Returns the shared cache.
    #[must_use]
    pub const fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Number of bindings whose fetch has not finished.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}
