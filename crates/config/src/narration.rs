//! Narration engine tunables

use serde::{Deserialize, Serialize};

/// Narration engine configuration
///
/// Applies to new playback sessions; changes never retroactively mutate an
/// in-flight session's already-resolved audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// Look-ahead depth for audio prefetch (units ahead of the cursor)
    #[serde(default = "default_prefetch_depth")]
    pub prefetch_depth: usize,

    /// Pause before the first sentence of a paragraph (ms, 0 disables)
    #[serde(default = "default_paragraph_pause_ms")]
    pub paragraph_pause_ms: u64,

    /// Playback volume (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Playback rate multiplier
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f32,

    /// Voice identifier (provider default when unset)
    #[serde(default)]
    pub voice: Option<String>,

    /// TTS provider to route synthesis through (registry default when unset)
    #[serde(default)]
    pub provider_id: Option<i64>,

    /// Voice clone to apply when the provider supports cloning
    #[serde(default)]
    pub voice_clone_id: Option<i64>,

    /// Deadline for a single synthesis request (seconds)
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_timeout_secs: u64,
}

fn default_prefetch_depth() -> usize {
    2
}
fn default_paragraph_pause_ms() -> u64 {
    400
}
fn default_volume() -> f32 {
    1.0
}
fn default_playback_rate() -> f32 {
    1.0
}
fn default_synthesis_timeout() -> u64 {
    120
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            prefetch_depth: default_prefetch_depth(),
            paragraph_pause_ms: default_paragraph_pause_ms(),
            volume: default_volume(),
            playback_rate: default_playback_rate(),
            voice: None,
            provider_id: None,
            voice_clone_id: None,
            synthesis_timeout_secs: default_synthesis_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NarrationConfig::default();
        assert_eq!(config.prefetch_depth, 2);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.playback_rate, 1.0);
        assert!(config.voice.is_none());
    }
}
