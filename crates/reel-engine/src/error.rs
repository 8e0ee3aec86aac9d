//! Engine error taxonomy
//!
//! Everything that can stop a blueprint file. Validation, resolution and
//! host failures abort the current file only; [`EngineError::Action`] wraps
//! them with the failing index and kind so batch logs stay actionable.
//! Synthesis failures and terminal-wait expiry are deliberately absent:
//! both are non-fatal and logged at `warn` where they occur.

use crate::host::HostError;
use reel_model::ValidationError;
use reel_text::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The blueprint failed parsing or cross-field validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A pattern search came up empty
    #[error(transparent)]
    Pattern(#[from] ResolveError),

    /// The editing surface or terminal host refused an operation
    #[error(transparent)]
    Host(#[from] HostError),

    /// The blueprint file itself could not be read
    #[error("failed to read blueprint `{path}`: {message}")]
    BlueprintIo { path: String, message: String },

    /// An action needs an open document and none is
    #[error("no document is open; an openFile action must come first")]
    NoDocument,

    /// A failure wrapped with the index and kind of the action it killed
    #[error("action {index} ({kind}) failed: {source}")]
    Action {
        index: usize,
        kind: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    /// A run was requested while another blueprint is processing
    #[error("engine is busy: a blueprint is already running")]
    Busy,
}

impl EngineError {
    /// Wrap a failure with its action context.
    #[must_use]
    pub fn at_action(self, index: usize, kind: &'static str) -> Self {
        EngineError::Action {
            index,
            kind,
            source: Box::new(self),
        }
    }
}
