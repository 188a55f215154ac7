//! Two-state pressable button with per-state background images.

use std::collections::HashMap;
use std::sync::Arc;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Paragraph, Widget},
};

use crate::domain::entities::SharedImage;

bitflags::bitflags! {
    /// Control states a background image can be registered for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlState: u8 {
        /// Focused or being pressed.
        const HIGHLIGHTED = 1 << 0;
        /// Chosen.
        const SELECTED = 1 << 1;
        /// Not accepting presses.
        const DISABLED = 1 << 2;
    }
}

impl ControlState {
    /// The resting state; images registered here are the fallback for every state.
    pub const NORMAL: Self = Self::empty();
}

/// Pressable element holding a background image per control state.
#[derive(Clone)]
pub struct Button {
    images: HashMap<ControlState, SharedImage>,
    selected: bool,
    highlighted: bool,
    enabled: bool,
}

impl Button {
    /// Creates an enabled, unselected button with no images.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            selected: false,
            highlighted: false,
            enabled: true,
        }
    }

    /// Sets or clears the background image for `state`.
    pub fn set_background_image(&mut self, image: Option<SharedImage>, state: ControlState) {
        match image {
            Some(image) => {
                self.images.insert(state, image);
            }
            None => {
                self.images.remove(&state);
            }
        }
    }

    /// Image registered for exactly `state`.
    #[must_use]
    pub fn background_image(&self, state: ControlState) -> Option<&SharedImage> {
        self.images.get(&state)
    }

    /// Image displayed in `state`, falling back to selected then normal.
    #[must_use]
    pub fn image_for(&self, state: ControlState) -> Option<&SharedImage> {
        self.images
            .get(&state)
            .or_else(|| {
                state
                    .contains(ControlState::SELECTED)
                    .then(|| self.images.get(&ControlState::SELECTED))
                    .flatten()
            })
            .or_else(|| self.images.get(&ControlState::NORMAL))
    }

    /// Current control state.
    #[must_use]
    pub fn state(&self) -> ControlState {
        let mut state = ControlState::NORMAL;
        state.set(ControlState::SELECTED, self.selected);
        state.set(ControlState::HIGHLIGHTED, self.highlighted);
        state.set(ControlState::DISABLED, !self.enabled);
        state
    }

    /// Image shown for the current state.
    #[must_use]
    pub fn current_image(&self) -> Option<&SharedImage> {
        self.image_for(self.state())
    }

    /// Toggles selection. Disabled buttons ignore presses.
    ///
    /// Returns the selection after the press.
    pub fn press(&mut self) -> bool {
        if self.enabled {
            self.selected = !self.selected;
        }
        self.selected
    }

    /// Sets selection.
    pub const fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Returns true if selected.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Sets highlight (focus) state.
    pub const fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Enables or disables the button.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn border_style(&self) -> Style {
        if !self.enabled {
            Style::default().fg(Color::DarkGray)
        } else if self.selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if self.highlighted {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        }
    }
}

impl Default for Button {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Button")
            .field("states_with_images", &self.images.keys().collect::<Vec<_>>())
            .field("selected", &self.selected)
            .field("highlighted", &self.highlighted)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Short text standing in for the displayed image.
#[must_use]
pub fn image_caption(image: Option<&SharedImage>) -> String {
    image.map_or_else(
        || "[ no image ]".to_string(),
        |img| format!("[{}x{}]", img.width(), img.height()),
    )
}

impl Widget for &Button {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().border_style(self.border_style());
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 {
            return;
        }

        let caption = image_caption(self.current_image());
        let middle = Rect {
            y: inner.y + inner.height.saturating_sub(1) / 2,
            height: 1,
            ..inner
        };
        Paragraph::new(Line::from(caption))
            .alignment(Alignment::Center)
            .render(middle, buf);
    }
}

/// Returns true if both options point at the same shared image.
#[must_use]
pub fn same_image(a: Option<&SharedImage>, b: Option<&SharedImage>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(w: u32, h: u32) -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(w, h))
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.x + buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_selected_falls_back_to_normal() {
        let mut button = Button::new();
        let normal = img(1, 1);
        button.set_background_image(Some(normal.clone()), ControlState::NORMAL);

        button.set_selected(true);
        assert!(same_image(button.current_image(), Some(&normal)));
    }

    #[test]
    fn test_selected_image_wins_when_selected() {
        let mut button = Button::new();
        let normal = img(1, 1);
        let selected = img(2, 2);
        button.set_background_image(Some(normal.clone()), ControlState::NORMAL);
        button.set_background_image(Some(selected.clone()), ControlState::SELECTED);

        assert!(same_image(button.current_image(), Some(&normal)));
        button.press();
        assert!(same_image(button.current_image(), Some(&selected)));

        button.set_highlighted(true);
        assert!(same_image(button.current_image(), Some(&selected)));
    }

    #[test]
    fn test_clearing_image() {
        let mut button = Button::new();
        button.set_background_image(Some(img(1, 1)), ControlState::NORMAL);
        button.set_background_image(None, ControlState::NORMAL);
        assert!(button.current_image().is_none());
    }

    #[test]
    fn test_disabled_ignores_press() {
        let mut button = Button::new();
        button.set_enabled(false);

        assert!(!button.press());
        assert!(button.state().contains(ControlState::DISABLED));
    }

    #[test]
    fn test_render_shows_image_caption() {
        let mut button = Button::new();
        button.set_background_image(Some(img(64, 32)), ControlState::NORMAL);

        let area = Rect::new(0, 0, 16, 3);
        let mut buf = Buffer::empty(area);
        (&button).render(area, &mut buf);

        assert!(row(&buf, 1).contains("[64x32]"));
        assert_eq!(buf[(0, 0)].symbol(), "┌");
    }
}
