//! Upstream service endpoints and TTS provider descriptions

use serde::{Deserialize, Serialize};

/// Episode generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the story generation service
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Timeout for the streaming generation connection (seconds)
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
}

fn default_generation_base_url() -> String {
    "http://localhost:8001".to_string()
}
fn default_stream_timeout() -> u64 {
    300
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            stream_timeout_secs: default_stream_timeout(),
        }
    }
}

/// TTS provider families understood by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProviderType {
    Kokoro,
    Piper,
    CoquiXtts,
    OpenAiCompatible,
    Chatterbox,
}

impl TtsProviderType {
    /// Whether this provider family can stream encoded audio.
    pub const fn supports_streaming(self) -> bool {
        match self {
            Self::Kokoro | Self::CoquiXtts | Self::OpenAiCompatible | Self::Chatterbox => true,
            Self::Piper => false,
        }
    }

    /// Whether this provider family accepts a voice-clone reference.
    pub const fn supports_voice_cloning(self) -> bool {
        match self {
            Self::CoquiXtts | Self::Chatterbox => true,
            Self::Kokoro | Self::Piper | Self::OpenAiCompatible => false,
        }
    }
}

/// One configured TTS provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsProviderConfig {
    pub id: i64,
    pub name: String,
    pub provider_type: TtsProviderType,
    pub base_url: String,

    /// Voice used when a request does not name one
    #[serde(default)]
    pub default_voice: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Provider used when a request does not name one
    #[serde(default)]
    pub is_default: bool,
}

/// A stored voice-clone reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCloneConfig {
    pub id: i64,
    pub provider_id: i64,
    pub name: String,
    /// Reference audio handed to providers that support cloning
    pub reference_audio_path: String,
}

/// TTS routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Configured providers
    #[serde(default)]
    pub providers: Vec<TtsProviderConfig>,

    /// Stored voice clones
    #[serde(default)]
    pub voice_clones: Vec<VoiceCloneConfig>,

    /// Fallback endpoint when no provider is configured
    #[serde(default = "default_fallback_base_url")]
    pub fallback_base_url: String,

    /// Fallback voice when no provider is configured
    #[serde(default = "default_fallback_voice")]
    pub fallback_voice: String,
}

fn default_fallback_base_url() -> String {
    "http://localhost:8880".to_string()
}
fn default_fallback_voice() -> String {
    "af_bella".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            voice_clones: Vec::new(),
            fallback_base_url: default_fallback_base_url(),
            fallback_voice: default_fallback_voice(),
        }
    }
}
