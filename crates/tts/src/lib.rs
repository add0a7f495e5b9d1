//! Audio synthesis backends
//!
//! Features:
//! - `SpeechBackend`: the audio-generation interface the engine consumes
//! - OpenAI-compatible HTTP provider (request/response and streaming)
//! - Provider registry with instance caching and capability introspection

mod openai_compat;
mod registry;

pub use openai_compat::OpenAiSpeechProvider;
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use narrator_core::{AudioHandle, TtsError};

/// One synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Voice identifier (provider default when unset)
    pub voice: Option<String>,
    /// Provider to route through (registry default when unset)
    pub provider_id: Option<i64>,
    /// Voice clone to apply when the provider supports cloning
    pub voice_clone_id: Option<i64>,
    /// Speech speed multiplier
    pub speed: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            provider_id: None,
            voice_clone_id: None,
            speed: 1.0,
        }
    }
}

/// Voice offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Capability introspection result, cached by callers per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    pub supports_streaming: bool,
    pub supports_voice_cloning: bool,
}

/// Audio synthesis backend.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize one unit of text into a resolved audio handle.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError>;

    /// Synthesize via the provider's streaming endpoint, buffering the byte
    /// stream into a single handle before playback. Falls back to the
    /// request/response variant for backends without streaming.
    async fn synthesize_buffered(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError> {
        self.synthesize(request).await
    }

    /// List voices offered by this backend.
    async fn voices(&self) -> Result<Vec<VoiceInfo>, TtsError>;

    /// Whether the backend is reachable and healthy.
    async fn health_check(&self) -> bool;

    /// Capability introspection.
    fn capabilities(&self) -> ProviderCapabilities;
}
