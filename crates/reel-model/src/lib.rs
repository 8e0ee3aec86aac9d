//! Blueprint model (reel-model)
//!
//! Typed representation of a playback blueprint:
//! - [`Blueprint`]: the immutable script, deserialized from camelCase JSON
//! - [`Action`]: a closed sum type over the supported operation kinds
//! - load-time validation that rejects malformed scripts before any action
//!   executes (unknown tags, ambiguous location selectors, missing `with`)

pub mod action;
pub mod blueprint;
pub mod error;

pub use action::{Action, CursorTarget, InsertSelector, SearchOpts, Voiceover, VoiceoverTiming};
pub use blueprint::Blueprint;
pub use error::ValidationError;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
