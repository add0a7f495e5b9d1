//! Provider routing and instance caching

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use narrator_config::{TtsProviderConfig, TtsProviderType, TtsSettings, VoiceCloneConfig};
use narrator_core::{AudioHandle, TtsError};

use crate::openai_compat::OpenAiSpeechProvider;
use crate::{ProviderCapabilities, SpeechBackend, SpeechRequest, VoiceInfo};

/// Routes synthesis requests to configured providers.
///
/// Provider instances are cached per id and rebuilt when the configured
/// base URL changes. With no provider configured, requests go to the
/// fallback kokoro endpoint from settings.
pub struct ProviderRegistry {
    settings: TtsSettings,
    instances: DashMap<i64, Arc<OpenAiSpeechProvider>>,
    fallback: Arc<OpenAiSpeechProvider>,
}

impl ProviderRegistry {
    pub fn new(settings: TtsSettings) -> Result<Self, TtsError> {
        let fallback_config = TtsProviderConfig {
            id: 0,
            name: "fallback".to_string(),
            provider_type: TtsProviderType::Kokoro,
            base_url: settings.fallback_base_url.clone(),
            default_voice: Some(settings.fallback_voice.clone()),
            enabled: true,
            is_default: false,
        };
        let fallback = Arc::new(OpenAiSpeechProvider::new(&fallback_config, Vec::new())?);
        Ok(Self {
            settings,
            instances: DashMap::new(),
            fallback,
        })
    }

    /// Provider for a request: explicit id, then the configured default,
    /// then the fallback endpoint.
    fn resolve(&self, provider_id: Option<i64>) -> Result<Arc<OpenAiSpeechProvider>, TtsError> {
        let config = match provider_id {
            Some(id) => Some(
                self.settings
                    .providers
                    .iter()
                    .find(|p| p.id == id && p.enabled)
                    .ok_or(TtsError::UnknownProvider(id))?,
            ),
            None => self.settings.providers.iter().find(|p| p.is_default && p.enabled),
        };

        match config {
            Some(config) => self.instance(config),
            None => Ok(self.fallback.clone()),
        }
    }

    fn instance(&self, config: &TtsProviderConfig) -> Result<Arc<OpenAiSpeechProvider>, TtsError> {
        if let Some(cached) = self.instances.get(&config.id) {
            // still valid only while the configured URL is unchanged
            if cached.base_url() == config.base_url.trim_end_matches('/') {
                return Ok(cached.clone());
            }
        }

        let clones: Vec<VoiceCloneConfig> = self
            .settings
            .voice_clones
            .iter()
            .filter(|clone| clone.provider_id == config.id)
            .cloned()
            .collect();
        let instance = Arc::new(OpenAiSpeechProvider::new(config, clones)?);
        self.instances.insert(config.id, instance.clone());
        Ok(instance)
    }

    /// Drop cached instances, for one provider or all of them.
    pub fn clear_cache(&self, provider_id: Option<i64>) {
        match provider_id {
            Some(id) => {
                self.instances.remove(&id);
            }
            None => self.instances.clear(),
        }
    }

    /// Capabilities of the provider a request would route to.
    pub fn capabilities_for(&self, provider_id: Option<i64>) -> Result<ProviderCapabilities, TtsError> {
        Ok(self.resolve(provider_id)?.capabilities())
    }

    /// Health of every configured provider.
    pub async fn health_check_all(&self) -> Vec<(i64, bool)> {
        let mut results = Vec::new();
        for config in &self.settings.providers {
            let healthy = match self.instance(config) {
                Ok(provider) => provider.health_check().await,
                Err(err) => {
                    warn!(provider = config.id, %err, "provider instantiation failed");
                    false
                }
            };
            results.push((config.id, healthy));
        }
        results
    }
}

#[async_trait]
impl SpeechBackend for ProviderRegistry {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError> {
        self.resolve(request.provider_id)?.synthesize(request).await
    }

    async fn synthesize_buffered(&self, request: &SpeechRequest) -> Result<AudioHandle, TtsError> {
        self.resolve(request.provider_id)?
            .synthesize_buffered(request)
            .await
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, TtsError> {
        self.resolve(None)?.voices().await
    }

    async fn health_check(&self) -> bool {
        match self.resolve(None) {
            Ok(provider) => provider.health_check().await,
            Err(_) => false,
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.resolve(None)
            .map(|provider| provider.capabilities())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(id: i64, is_default: bool, provider_type: TtsProviderType) -> TtsProviderConfig {
        TtsProviderConfig {
            id,
            name: format!("provider-{id}"),
            provider_type,
            base_url: format!("http://localhost:{}", 8880 + id),
            default_voice: None,
            enabled: true,
            is_default,
        }
    }

    fn registry() -> ProviderRegistry {
        let settings = TtsSettings {
            providers: vec![
                provider_config(1, true, TtsProviderType::Kokoro),
                provider_config(2, false, TtsProviderType::CoquiXtts),
            ],
            voice_clones: vec![VoiceCloneConfig {
                id: 7,
                provider_id: 2,
                name: "narrator".into(),
                reference_audio_path: "/data/clones/narrator.wav".into(),
            }],
            ..Default::default()
        };
        ProviderRegistry::new(settings).unwrap()
    }

    #[test]
    fn test_resolve_default_and_explicit() {
        let registry = registry();
        assert_eq!(registry.resolve(None).unwrap().base_url(), "http://localhost:8881");
        assert_eq!(registry.resolve(Some(2)).unwrap().base_url(), "http://localhost:8882");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.resolve(Some(99)),
            Err(TtsError::UnknownProvider(99))
        ));
    }

    #[test]
    fn test_fallback_when_no_default_configured() {
        let settings = TtsSettings::default();
        let registry = ProviderRegistry::new(settings).unwrap();
        assert_eq!(registry.resolve(None).unwrap().base_url(), "http://localhost:8880");
    }

    #[test]
    fn test_instances_cached_and_cleared() {
        let registry = registry();
        let first = registry.resolve(Some(1)).unwrap();
        let second = registry.resolve(Some(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        registry.clear_cache(Some(1));
        let third = registry.resolve(Some(1)).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_capabilities_for_routing() {
        let registry = registry();
        assert!(!registry.capabilities_for(Some(1)).unwrap().supports_voice_cloning);
        assert!(registry.capabilities_for(Some(2)).unwrap().supports_voice_cloning);
    }
}
