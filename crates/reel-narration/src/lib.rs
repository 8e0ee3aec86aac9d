//! Narration cache (reel-narration)
//!
//! Content-addressed pre-generation of spoken narration:
//! - [`NarrationKey`]: blake3 hash of (text, voice), one audio artifact per key
//! - [`NarrationCache`]: concurrent dedup cache; at most one synthesis call
//!   per key regardless of caller concurrency
//! - [`SpeechSynthesizer`]: the host-provided text-to-speech backend
//!
//! Synthesis failures are never fatal to playback: a failed key resolves to
//! `None` and the caller skips narration silently.

pub mod cache;
pub mod key;

pub use cache::{CacheEntry, EntryStatus, NarrationCache, NarrationRequest};
pub use key::NarrationKey;

use async_trait::async_trait;

/// Text-to-speech backend supplied by the host.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize `text` in `voice`, returning encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Synthesis or artifact-storage failure. Cloneable so every caller awaiting
/// a shared in-flight generation observes the same outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    /// The synthesis backend refused or failed the request
    #[error("synthesis failed: {0}")]
    Backend(String),

    /// Writing the audio artifact to the cache directory failed
    #[error("audio artifact write failed: {0}")]
    Io(String),
}
