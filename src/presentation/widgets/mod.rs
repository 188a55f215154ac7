mod button;
mod choice_button;

pub use button::{Button, ControlState, image_caption, same_image};
pub use choice_button::{ChoiceButtonView, control_state_for};
