//! Image choice descriptor consumed by choice buttons.

use serde::{Deserialize, Serialize};

use super::image::{ImageUrl, SharedImage};
use super::slot::Slot;

/// Opaque answer value carried by a choice.
/// Comparable and serializable so the host can collect and persist answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    /// Boolean answer.
    Bool(bool),
    /// Integer answer.
    Integer(i64),
    /// Free-form identifier.
    Text(String),
}

impl From<bool> for ChoiceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ChoiceValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// An answer option shown as an image button.
///
/// Either state may be backed by a remote URL, a local placeholder, both,
/// or neither. Immutable once constructed.
#[derive(Clone)]
pub struct ImageChoice {
    normal_image_url: Option<ImageUrl>,
    selected_image_url: Option<ImageUrl>,
    normal_placeholder: Option<SharedImage>,
    selected_placeholder: Option<SharedImage>,
    text: String,
    value: ChoiceValue,
}

impl ImageChoice {
    /// Creates a new image choice.
    #[must_use]
    pub fn new(
        normal_image_url: Option<ImageUrl>,
        selected_image_url: Option<ImageUrl>,
        normal_placeholder: Option<SharedImage>,
        selected_placeholder: Option<SharedImage>,
        text: impl Into<String>,
        value: impl Into<ChoiceValue>,
    ) -> Self {
        Self {
            normal_image_url,
            selected_image_url,
            normal_placeholder,
            selected_placeholder,
            text: text.into(),
            value: value.into(),
        }
    }

    /// Starts a builder with only text and value set.
    #[must_use]
    pub fn builder(text: impl Into<String>, value: impl Into<ChoiceValue>) -> ImageChoiceBuilder {
        ImageChoiceBuilder {
            choice: Self::new(None, None, None, None, text, value),
        }
    }

    /// URL of the normal-state image.
    #[must_use]
    pub const fn normal_image_url(&self) -> Option<&ImageUrl> {
        self.normal_image_url.as_ref()
    }

    /// URL of the selected-state image.
    #[must_use]
    pub const fn selected_image_url(&self) -> Option<&ImageUrl> {
        self.selected_image_url.as_ref()
    }

    /// Placeholder for the normal state.
    #[must_use]
    pub const fn normal_placeholder(&self) -> Option<&SharedImage> {
        self.normal_placeholder.as_ref()
    }

    /// Placeholder for the selected state.
    #[must_use]
    pub const fn selected_placeholder(&self) -> Option<&SharedImage> {
        self.selected_placeholder.as_ref()
    }

    /// Display text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Answer value.
    #[must_use]
    pub const fn value(&self) -> &ChoiceValue {
        &self.value
    }

    /// URL bound to a slot.
    #[must_use]
    pub const fn url_for(&self, slot: Slot) -> Option<&ImageUrl> {
        match slot {
            Slot::Normal => self.normal_image_url(),
            Slot::Selected => self.selected_image_url(),
        }
    }

    /// Placeholder bound to a slot.
    #[must_use]
    pub const fn placeholder_for(&self, slot: Slot) -> Option<&SharedImage> {
        match slot {
            Slot::Normal => self.normal_placeholder(),
            Slot::Selected => self.selected_placeholder(),
        }
    }

    /// Returns true if any state needs a network fetch.
    #[must_use]
    pub const fn has_remote_images(&self) -> bool {
        self.normal_image_url.is_some() || self.selected_image_url.is_some()
    }
}

impl std::fmt::Debug for ImageChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageChoice")
            .field("text", &self.text)
            .field("value", &self.value)
            .field("normal_image_url", &self.normal_image_url)
            .field("selected_image_url", &self.selected_image_url)
            .field("has_normal_placeholder", &self.normal_placeholder.is_some())
            .field(
                "has_selected_placeholder",
                &self.selected_placeholder.is_some(),
            )
            .finish()
    }
}

/// Fluent builder for [`ImageChoice`].
#[derive(Debug, Clone)]
pub struct ImageChoiceBuilder {
    choice: ImageChoice,
}

impl ImageChoiceBuilder {
    /// Sets the normal-state URL.
    #[must_use]
    pub fn with_normal_url(mut self, url: ImageUrl) -> Self {
        self.choice.normal_image_url = Some(url);
        self
    }

    /// Sets the selected-state URL.
    #[must_use]
    pub fn with_selected_url(mut self, url: ImageUrl) -> Self {
        self.choice.selected_image_url = Some(url);
        self
    }

    /// Sets the normal-state placeholder.
    #[must_use]
    pub fn with_normal_placeholder(mut self, image: SharedImage) -> Self {
        self.choice.normal_placeholder = Some(image);
        self
    }

    /// Sets the selected-state placeholder.
    #[must_use]
    pub fn with_selected_placeholder(mut self, image: SharedImage) -> Self {
        self.choice.selected_placeholder = Some(image);
        self
    }

    /// Finishes the choice.
    #[must_use]
    pub fn build(self) -> ImageChoice {
        self.choice
    }
}

/// Factory with the shape host survey frameworks expect.
///
/// Every argument but the value may be absent; missing text becomes an
/// empty label.
#[must_use]
pub fn make_image_choice(
    normal_url: Option<ImageUrl>,
    selected_url: Option<ImageUrl>,
    normal_placeholder: Option<SharedImage>,
    selected_placeholder: Option<SharedImage>,
    text: Option<String>,
    value: impl Into<ChoiceValue>,
) -> ImageChoice {
    ImageChoice::new(
        normal_url,
        selected_url,
        normal_placeholder,
        selected_placeholder,
        text.unwrap_or_default(),
        value,
    )
}
