//! Presentation layer with the choice button widgets.

/// Reusable widgets.
pub mod widgets;

pub use widgets::{Button, ChoiceButtonView, ControlState};
