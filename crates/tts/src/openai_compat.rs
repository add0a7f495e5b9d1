//! OpenAI-compatible speech synthesis over HTTP
//!
//! Covers kokoro-style services exposing `POST /v1/audio/speech` and
//! `GET /v1/audio/voices`, plus the piper/xtts/chatterbox gateways that
//! speak the same shape.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use narrator_config::{TtsProviderConfig, TtsProviderType, VoiceCloneConfig};
use narrator_core::{AudioHandle, TtsError};

use crate::{ProviderCapabilities, SpeechBackend, SpeechRequest, VoiceInfo};

const HTTP_TIMEOUT_SECS: u64 = 120;
const HEALTH_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Serialize)]
struct SpeechPayload<'a> {
    model: &'static str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_audio: Option<&'a str>,
}

/// One OpenAI-compatible TTS endpoint.
pub struct OpenAiSpeechProvider {
    http: Client,
    base_url: String,
    provider_type: TtsProviderType,
    default_voice: Option<String>,
    /// Voice clones stored for this provider, resolved by id per request.
    clones: Vec<VoiceCloneConfig>,
}

impl OpenAiSpeechProvider {
    pub fn new(
        config: &TtsProviderConfig,
        clones: Vec<VoiceCloneConfig>,
    ) -> Result<Self, TtsError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| TtsError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            provider_type: config.provider_type,
            default_voice: config.default_voice.clone(),
            clones,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn provider_type(&self) -> TtsProviderType {
        self.provider_type
    }

    fn model_name(&self) -> &'static str {
        match self.provider_type {
            TtsProviderType::Kokoro => "kokoro",
            TtsProviderType::Piper => "piper",
            TtsProviderType::CoquiXtts => "xtts",
            TtsProviderType::OpenAiCompatible => "tts-1",
            TtsProviderType::Chatterbox => "chatterbox",
        }
    }

    fn payload<'a>(&'a self, request: &'a SpeechRequest, stream: bool) -> SpeechPayload<'a> {
        let voice = request
            .voice
            .as_deref()
            .or(self.default_voice.as_deref())
            .unwrap_or("af_bella");

        // clone references only apply where the provider supports cloning
        let reference_audio = request
            .voice_clone_id
            .filter(|_| self.provider_type.supports_voice_cloning())
            .and_then(|id| self.clones.iter().find(|clone| clone.id == id))
            .map(|clone| clone.reference_audio_path.as_str());

        SpeechPayload {
            model: self.model_name(),
            input: &request.text,
            voice,
            speed: request.speed,
            response_format: "mp3",
            stream: stream.then_some(true),
            reference_audio,
        }
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeechProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError> {
        let response = self
            .http
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&self.payload(request, false))
            .send()
            .await
            .map_err(|e| TtsError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TtsError::Status(response.status().as_u16()));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TtsError::Http(e.to_string()))?;
        if audio.is_empty() {
            return Err(TtsError::InvalidResponse("empty audio body".to_string()));
        }
        debug!(bytes = audio.len(), "synthesized audio");
        Ok(AudioHandle::Buffer(audio))
    }

    async fn synthesize_buffered(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError> {
        if !self.provider_type.supports_streaming() {
            return self.synthesize(request).await;
        }

        let response = self
            .http
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&self.payload(request, true))
            .send()
            .await
            .map_err(|e| TtsError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TtsError::Status(response.status().as_u16()));
        }

        // encoded chunks are buffered and decoded as one unit downstream
        let mut audio = BytesMut::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            audio.put(chunk.map_err(|e| TtsError::Http(e.to_string()))?);
        }
        if audio.is_empty() {
            return Err(TtsError::InvalidResponse("empty audio stream".to_string()));
        }
        debug!(bytes = audio.len(), "buffered streamed audio");
        Ok(AudioHandle::Buffer(audio.freeze()))
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, TtsError> {
        let response = self
            .http
            .get(format!("{}/v1/audio/voices", self.base_url))
            .send()
            .await
            .map_err(|e| TtsError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TtsError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TtsError::InvalidResponse(e.to_string()))?;
        Ok(normalize_voices(&body))
    }

    async fn health_check(&self) -> bool {
        let health = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await;
        if let Ok(response) = health {
            if response.status().is_success() {
                return true;
            }
        }
        // some services have no /health; a reachable voice listing counts
        self.voices().await.is_ok()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_streaming: self.provider_type.supports_streaming(),
            supports_voice_cloning: self.provider_type.supports_voice_cloning(),
        }
    }
}

/// Voice listings come back either as bare id strings or as full records.
fn normalize_voices(body: &serde_json::Value) -> Vec<VoiceInfo> {
    let Some(entries) = body.get("voices").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            serde_json::Value::String(id) => Some(voice_from_id(id)),
            value => serde_json::from_value(value.clone()).ok(),
        })
        .collect()
}

/// Expand a bare kokoro voice id (`af_bella`) into display metadata.
fn voice_from_id(id: &str) -> VoiceInfo {
    let prefixes = [
        ("af_", "American Female", "en-US", "female"),
        ("am_", "American Male", "en-US", "male"),
        ("bf_", "British Female", "en-GB", "female"),
        ("bm_", "British Male", "en-GB", "male"),
    ];

    for (prefix, kind, language, gender) in prefixes {
        if let Some(rest) = id.strip_prefix(prefix) {
            let name = rest
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            return VoiceInfo {
                id: id.to_string(),
                name: format!("{name} ({kind})"),
                language: Some(language.to_string()),
                gender: Some(gender.to_string()),
            };
        }
    }

    VoiceInfo {
        id: id.to_string(),
        name: id.to_string(),
        language: None,
        gender: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(provider_type: TtsProviderType) -> OpenAiSpeechProvider {
        let config = TtsProviderConfig {
            id: 1,
            name: "test".into(),
            provider_type,
            base_url: "http://localhost:8880/".into(),
            default_voice: Some("af_bella".into()),
            enabled: true,
            is_default: true,
        };
        let clones = vec![VoiceCloneConfig {
            id: 9,
            provider_id: 1,
            name: "narrator".into(),
            reference_audio_path: "/data/clones/narrator.wav".into(),
        }];
        OpenAiSpeechProvider::new(&config, clones).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(provider(TtsProviderType::Kokoro).base_url(), "http://localhost:8880");
    }

    #[test]
    fn test_payload_uses_default_voice() {
        let provider = provider(TtsProviderType::Kokoro);
        let request = SpeechRequest::new("Hello.");
        let payload = provider.payload(&request, false);
        assert_eq!(payload.voice, "af_bella");
        assert_eq!(payload.model, "kokoro");
        assert!(payload.stream.is_none());
        assert!(payload.reference_audio.is_none());
    }

    #[test]
    fn test_clone_reference_only_for_cloning_providers() {
        let mut request = SpeechRequest::new("Hello.");
        request.voice_clone_id = Some(9);

        let kokoro = provider(TtsProviderType::Kokoro);
        assert!(kokoro.payload(&request, false).reference_audio.is_none());

        let xtts = provider(TtsProviderType::CoquiXtts);
        assert_eq!(
            xtts.payload(&request, false).reference_audio,
            Some("/data/clones/narrator.wav")
        );
    }

    #[test]
    fn test_payload_serializes_stream_flag() {
        let provider = provider(TtsProviderType::Kokoro);
        let request = SpeechRequest::new("Hi.");
        let body = serde_json::to_value(provider.payload(&request, true)).unwrap();
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["response_format"], json!("mp3"));
    }

    #[test]
    fn test_normalize_voices_mixed_entries() {
        let body = json!({
            "voices": [
                "af_bella",
                {"id": "custom", "name": "Custom Voice", "language": "en-US", "gender": "female"},
            ]
        });
        let voices = normalize_voices(&body);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "af_bella");
        assert_eq!(voices[0].name, "Bella (American Female)");
        assert_eq!(voices[1].name, "Custom Voice");
    }

    #[test]
    fn test_voice_from_unknown_prefix() {
        let voice = voice_from_id("xx_mystery");
        assert_eq!(voice.name, "xx_mystery");
        assert!(voice.language.is_none());
    }

    #[test]
    fn test_capabilities_follow_provider_type() {
        assert!(!provider(TtsProviderType::Piper).capabilities().supports_streaming);
        assert!(provider(TtsProviderType::Chatterbox).capabilities().supports_voice_cloning);
    }
}
