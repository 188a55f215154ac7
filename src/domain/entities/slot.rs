//! Per-slot binding state for image-backed buttons.

use std::fmt;
use std::sync::Arc;

use super::image::{FetchOutcome, ImageSource, ImageUrl, SharedImage};

/// One of the two image positions on a choice button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Image shown while the choice is not selected.
    Normal,
    /// Image shown while the choice is selected.
    Selected,
}

impl Slot {
    /// Both slots, in binding order.
    pub const ALL: [Self; 2] = [Self::Normal, Self::Selected];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Selected => write!(f, "selected"),
        }
    }
}

/// Monotonic binding counter for one (view, slot) pair.
/// A completion carrying an older generation is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display state of a slot within one generation.
///
/// `Empty -> PlaceholderShown -> {ImageShown | PlaceholderRetained}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotPhase {
    /// Nothing bound yet.
    #[default]
    Empty,
    /// Bound; the placeholder (possibly none) is displayed while the URL resolves.
    PlaceholderShown,
    /// The resolved image is displayed.
    ImageShown,
    /// Resolution failed or was superseded; the placeholder stays.
    PlaceholderRetained,
}

impl SlotPhase {
    /// Returns true once the generation can no longer change the display.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ImageShown | Self::PlaceholderRetained)
    }

    /// Returns true while a resolution for the current generation is awaited.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::PlaceholderShown)
    }
}

/// Binding of one slot to a URL, with stale-result suppression.
#[derive(Clone, Default)]
pub struct SlotBinding {
    generation: Generation,
    url: Option<ImageUrl>,
    placeholder: Option<SharedImage>,
    displayed: Option<SharedImage>,
    source: Option<ImageSource>,
    phase: SlotPhase,
}

impl SlotBinding {
    /// Creates an empty binding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation bound to `url`, showing `placeholder` immediately.
    pub fn begin(&mut self, url: ImageUrl, placeholder: Option<SharedImage>) -> Generation {
        self.generation = self.generation.next();
        self.url = Some(url);
        self.source = None;
        self.displayed.clone_from(&placeholder);
        self.placeholder = placeholder;
        self.phase = SlotPhase::PlaceholderShown;
        self.generation
    }

    /// Shows a placeholder with no URL behind it.
    ///
    /// Counts as a new generation so any outstanding completion is dropped.
    pub fn show_static(&mut self, placeholder: Option<SharedImage>) -> Generation {
        self.generation = self.generation.next();
        self.url = None;
        self.source = None;
        self.displayed.clone_from(&placeholder);
        self.placeholder = placeholder;
        self.phase = SlotPhase::PlaceholderRetained;
        self.generation
    }

    /// Applies a resolution if `generation` is still current.
    ///
    /// Returns false for stale or already-terminal generations.
    pub fn complete(&mut self, generation: Generation, outcome: &FetchOutcome) -> bool {
        if generation != self.generation || self.phase != SlotPhase::PlaceholderShown {
            return false;
        }

        match outcome {
            FetchOutcome::Ready { image, source } => {
                self.displayed = Some(Arc::clone(image));
                self.source = Some(*source);
                self.phase = SlotPhase::ImageShown;
            }
            FetchOutcome::Unavailable { .. } => {
                self.phase = SlotPhase::PlaceholderRetained;
            }
        }
        true
    }

    /// Invalidates the current generation without starting a new request.
    pub fn supersede(&mut self) -> Generation {
        self.generation = self.generation.next();
        if self.phase == SlotPhase::PlaceholderShown {
            self.phase = SlotPhase::PlaceholderRetained;
        }
        self.generation
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// URL of the current binding, if any.
    #[must_use]
    pub const fn url(&self) -> Option<&ImageUrl> {
        self.url.as_ref()
    }

    /// Placeholder of the current binding, if any.
    #[must_use]
    pub const fn placeholder(&self) -> Option<&SharedImage> {
        self.placeholder.as_ref()
    }

    /// Image currently displayed: the resolved image or the placeholder.
    #[must_use]
    pub const fn displayed(&self) -> Option<&SharedImage> {
        self.displayed.as_ref()
    }

    /// Tier the displayed image came from, once resolved.
    #[must_use]
    pub const fn source(&self) -> Option<ImageSource> {
        self.source
    }
}

impl fmt::Debug for SlotBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBinding")
            .field("generation", &self.generation)
            .field("url", &self.url)
            .field("phase", &self.phase)
            .field("has_placeholder", &self.placeholder.is_some())
            .field("has_displayed", &self.displayed.is_some())
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(w: u32) -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(w, w))
    }

    fn url(s: &str) -> ImageUrl {
        ImageUrl::parse(s).unwrap()
    }

    fn ready(image: &SharedImage) -> FetchOutcome {
        FetchOutcome::Ready {
            image: Arc::clone(image),
            source: ImageSource::Network,
        }
    }

    #[test]
    fn test_begin_shows_placeholder() {
        let mut binding = SlotBinding::new();
        assert_eq!(binding.phase(), SlotPhase::Empty);

        let p = img(2);
        let generation = binding.begin(url("https://x/a.png"), Some(p.clone()));

        assert_eq!(generation.get(), 1);
        assert_eq!(binding.phase(), SlotPhase::PlaceholderShown);
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &p));
    }

    #[test]
    fn test_success_swaps_in_image() {
        let mut binding = SlotBinding::new();
        let generation = binding.begin(url("https://x/a.png"), Some(img(2)));
        let a = img(8);

        assert!(binding.complete(generation, &ready(&a)));
        assert_eq!(binding.phase(), SlotPhase::ImageShown);
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &a));
        assert_eq!(binding.source(), Some(ImageSource::Network));
    }

    #[test]
    fn test_failure_retains_placeholder() {
        let mut binding = SlotBinding::new();
        let p = img(2);
        let generation = binding.begin(url("https://x/b.png"), Some(p.clone()));

        assert!(binding.complete(generation, &FetchOutcome::unavailable("HTTP 404")));
        assert_eq!(binding.phase(), SlotPhase::PlaceholderRetained);
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &p));
    }

    #[test]
    fn test_failure_without_placeholder_stays_blank() {
        let mut binding = SlotBinding::new();
        let generation = binding.begin(url("https://x/b.png"), None);

        assert!(binding.complete(generation, &FetchOutcome::unavailable("timeout")));
        assert!(binding.displayed().is_none());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut binding = SlotBinding::new();
        let first = binding.begin(url("https://x/u1.png"), None);
        let second = binding.begin(url("https://x/u2.png"), None);
        let u1 = img(1);
        let u2 = img(2);

        assert!(!binding.complete(first, &ready(&u1)));
        assert_eq!(binding.phase(), SlotPhase::PlaceholderShown);

        assert!(binding.complete(second, &ready(&u2)));
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &u2));

        // A late u1 result after u2 applied must not win either.
        assert!(!binding.complete(first, &ready(&u1)));
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &u2));
    }

    #[test]
    fn test_supersede_suppresses_outstanding_completion() {
        let mut binding = SlotBinding::new();
        let p = img(2);
        let generation = binding.begin(url("https://x/a.png"), Some(p.clone()));

        binding.supersede();
        assert_eq!(binding.phase(), SlotPhase::PlaceholderRetained);

        assert!(!binding.complete(generation, &ready(&img(8))));
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &p));
    }

    #[test]
    fn test_terminal_generation_ignores_second_completion() {
        let mut binding = SlotBinding::new();
        let generation = binding.begin(url("https://x/a.png"), None);
        let a = img(3);

        assert!(binding.complete(generation, &ready(&a)));
        assert!(!binding.complete(generation, &FetchOutcome::unavailable("late")));
        assert_eq!(binding.phase(), SlotPhase::ImageShown);
    }

    #[test]
    fn test_rebind_restarts_generation() {
        let mut binding = SlotBinding::new();
        let first = binding.begin(url("https://x/b.png"), None);
        binding.complete(first, &FetchOutcome::unavailable("boom"));

        let retry = binding.begin(url("https://x/b.png"), None);
        assert!(retry > first);
        assert_eq!(binding.phase(), SlotPhase::PlaceholderShown);
    }

    #[test]
    fn test_show_static_has_no_url() {
        let mut binding = SlotBinding::new();
        let p = img(2);
        binding.show_static(Some(p.clone()));

        assert!(binding.url().is_none());
        assert!(binding.phase().is_terminal());
        assert!(Arc::ptr_eq(binding.displayed().unwrap(), &p));
    }
}
