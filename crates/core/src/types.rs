//! Shared data types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One sentence-level chunk of episode text queued for narration.
///
/// Immutable once created; identified only by its position in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackUnit {
    /// Text to synthesize.
    pub text: String,
    /// Set on the first sentence of every paragraph except the very first.
    /// Drives an inter-paragraph pacing pause, not a content distinction.
    pub is_paragraph_start: bool,
}

impl PlaybackUnit {
    pub fn new(text: impl Into<String>, is_paragraph_start: bool) -> Self {
        Self {
            text: text.into(),
            is_paragraph_start,
        }
    }
}

/// Resolved audio for one playback unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioHandle {
    /// Reference to audio hosted by the synthesis service.
    Url(String),
    /// Audio buffered in memory. Streaming synthesis is collected into a
    /// single buffer before playback.
    Buffer(Bytes),
}

impl AudioHandle {
    /// Length in bytes for buffered audio, `None` for references.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Url(_) => None,
            Self::Buffer(bytes) => Some(bytes.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// Structured payload of a `complete` stream event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeComplete {
    pub episode_id: i64,
    pub title: String,
    pub word_count: u64,
}

/// Opaque token identifying one generation session.
///
/// Captured when a session begins; stream events and queue commands tagged
/// with a superseded epoch are discarded on arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationEpoch(u64);

impl GenerationEpoch {
    /// The epoch before any session has started.
    pub const fn initial() -> Self {
        Self(0)
    }

    /// The epoch of the next session.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for GenerationEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
