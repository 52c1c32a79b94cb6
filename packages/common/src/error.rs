use thiserror::Error;

/// Malformed section content at create/update time.
///
/// Blocks the single operation it was raised for; surfaced to the author
/// with a specific message and never retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("HTML section content must be an html/css/js record")]
    ContentShapeMismatch,

    #[error("Shortcode content does not match [name attr=\"value\" ...] grammar: {0}")]
    InvalidShortcode(String),
}
