//! Load-time validation errors
//!
//! A malformed blueprint is rejected before the sequencer runs its first
//! action; every variant names the offending action index so an operator can
//! fix the script without replaying it.

/// Errors raised while loading or validating a blueprint.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Blueprint is not valid JSON at all
    #[error("blueprint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level structure is missing a required field
    #[error("blueprint is missing required field `{0}`")]
    MissingField(&'static str),

    /// Top-level field has the wrong JSON type
    #[error("blueprint field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// Action tag is not one of the supported kinds
    #[error("action {index}: unsupported action type `{tag}`")]
    UnsupportedAction { index: usize, tag: String },

    /// Action object does not deserialize into its declared kind
    #[error("action {index} ({tag}): {message}")]
    MalformedAction {
        index: usize,
        tag: String,
        message: String,
    },

    /// `insert` must set exactly one of `after`, `before`, `at`
    #[error("action {index}: insert requires exactly one of `after`, `before`, `at` (found {found})")]
    SelectorCount { index: usize, found: usize },

    /// `replace` without replacement text
    #[error("action {index}: replace requires `with`")]
    MissingReplacement { index: usize },

    /// `occurrence` is 1-indexed
    #[error("action {index}: `occurrence` must be >= 1")]
    ZeroOccurrence { index: usize },
}
