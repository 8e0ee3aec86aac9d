//! Content-addressed narration keys
//!
//! Identical (text, voice) pairs collapse to one key and therefore one audio
//! artifact, no matter how many actions narrate the same sentence.

use std::fmt::{self, Display, Formatter};

/// A 32-byte blake3 hash of (text, voice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NarrationKey([u8; 32]);

impl NarrationKey {
    /// Compute the key for a narration request.
    #[must_use]
    pub fn compute(text: &str, voice: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        // Separator keeps ("ab", "c") distinct from ("a", "bc").
        hasher.update(&[0]);
        hasher.update(voice.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw hash bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// File name of the cached audio artifact for this key.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.mp3", hex::encode(&self.0[..16]))
    }
}

impl Display for NarrationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
