//! Image URL validation errors.

use thiserror::Error;

/// Reasons an image URL string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ImageUrlError {
    #[error("invalid image URL `{input}`: {reason}")]
    Malformed { input: String, reason: String },

    #[error("unsupported URL scheme `{scheme}`")]
    UnsupportedScheme { scheme: String },
}
