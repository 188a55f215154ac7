//! Image choice button whose state images may come from remote URLs.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::domain::entities::{
    FetchOutcome, Generation, ImageChoice, ImageUrl, SharedImage, Slot, SlotBinding, ViewId,
};
use crate::domain::ports::ImageSlotTarget;
use crate::infrastructure::image::AsyncImageLoader;

use super::button::{Button, ControlState};

/// Button state a slot's image is assigned to.
#[must_use]
pub const fn control_state_for(slot: Slot) -> ControlState {
    match slot {
        Slot::Normal => ControlState::NORMAL,
        Slot::Selected => ControlState::SELECTED,
    }
}

/// Choice button built from an [`ImageChoice`].
///
/// Wraps a [`Button`] and keeps its normal and selected background images in
/// step with two independently loaded slots.
pub struct ChoiceButtonView {
    id: ViewId,
    descriptor: ImageChoice,
    label_text: String,
    button: Button,
    normal: SlotBinding,
    selected: SlotBinding,
}

impl ChoiceButtonView {
    /// Builds the view, showing placeholders now and loading remote images
    /// through `loader`.
    #[must_use]
    pub fn create(descriptor: ImageChoice, loader: &AsyncImageLoader) -> Self {
        let mut view = Self {
            id: ViewId::new(),
            label_text: descriptor.text().to_string(),
            descriptor,
            button: Button::new(),
            normal: SlotBinding::new(),
            selected: SlotBinding::new(),
        };
        view.bind_descriptor(loader);
        view
    }

    /// Rebinds the view to another choice, dropping outstanding loads first.
    pub fn reuse(&mut self, descriptor: ImageChoice, loader: &AsyncImageLoader) {
        loader.unbind_all(self);
        self.label_text = descriptor.text().to_string();
        self.descriptor = descriptor;
        self.bind_descriptor(loader);
    }

    /// Drops outstanding loads; later completions become no-ops.
    pub fn teardown(&mut self, loader: &AsyncImageLoader) {
        loader.unbind_all(self);
    }

    fn bind_descriptor(&mut self, loader: &AsyncImageLoader) {
        for slot in Slot::ALL {
            let placeholder = self.descriptor.placeholder_for(slot).cloned();
            match self.descriptor.url_for(slot).cloned() {
                Some(url) => {
                    loader.bind(self, slot, url, placeholder);
                }
                None => {
                    self.slot_mut(slot).show_static(placeholder);
                    self.sync_button(slot);
                }
            }
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotBinding {
        match slot {
            Slot::Normal => &mut self.normal,
            Slot::Selected => &mut self.selected,
        }
    }

    fn sync_button(&mut self, slot: Slot) {
        let image = self.slot(slot).displayed().cloned();
        self.button
            .set_background_image(image, control_state_for(slot));
    }

    /// View identifier.
    #[must_use]
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// Choice this view displays.
    #[must_use]
    pub const fn descriptor(&self) -> &ImageChoice {
        &self.descriptor
    }

    /// Label text.
    #[must_use]
    pub fn label_text(&self) -> &str {
        &self.label_text
    }

    /// Underlying button.
    #[must_use]
    pub const fn button(&self) -> &Button {
        &self.button
    }

    /// Underlying button, for hosts toggling selection or focus.
    pub const fn button_mut(&mut self) -> &mut Button {
        &mut self.button
    }

    /// Binding state of a slot.
    #[must_use]
    pub const fn slot(&self, slot: Slot) -> &SlotBinding {
        match slot {
            Slot::Normal => &self.normal,
            Slot::Selected => &self.selected,
        }
    }

    /// Image currently assigned to a slot's button state.
    #[must_use]
    pub fn image(&self, slot: Slot) -> Option<&SharedImage> {
        self.button.background_image(control_state_for(slot))
    }
}

impl ImageSlotTarget for ChoiceButtonView {
    fn target_id(&self) -> ViewId {
        self.id
    }

    fn begin_binding(
        &mut self,
        slot: Slot,
        url: ImageUrl,
        placeholder: Option<SharedImage>,
    ) -> Generation {
        let generation = self.slot_mut(slot).begin(url, placeholder);
        self.sync_button(slot);
        generation
    }

    fn complete_binding(
        &mut self,
        slot: Slot,
        generation: Generation,
        outcome: &FetchOutcome,
    ) -> bool {
        let applied = self.slot_mut(slot).complete(generation, outcome);
        if applied {
            self.sync_button(slot);
        }
        applied
    }

    fn cancel_binding(&mut self, slot: Slot) -> Generation {
        self.slot_mut(slot).supersede()
    }
}

impl std::fmt::Debug for ChoiceButtonView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoiceButtonView")
            .field("id", &self.id)
            .field("label_text", &self.label_text)
            .field("button", &self.button)
            .field("normal", &self.normal)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

/// Cuts `text` to `max_width` columns, ending with an ellipsis when cut.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

impl Widget for &ChoiceButtonView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let button_area = Rect {
            height: area.height - 1,
            ..area
        };
        let label_area = Rect {
            y: area.y + area.height - 1,
            height: 1,
            ..area
        };

        if button_area.height > 0 {
            self.button.render(button_area, buf);
        }

        let mut style = Style::default();
        if self.button.is_selected() {
            style = style.add_modifier(Modifier::BOLD);
        }
        let label = truncate_to_width(&self.label_text, usize::from(area.width));
        Paragraph::new(Line::styled(label, style))
            .alignment(Alignment::Center)
            .render(label_area, buf);
    }
}
