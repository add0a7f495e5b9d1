//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, GenerationConfig, NarrationConfig, TtsSettings};

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Narration engine configuration
    #[serde(default)]
    pub narration: NarrationConfig,

    /// Episode generation service
    #[serde(default)]
    pub generation: GenerationConfig,

    /// TTS providers and routing
    #[serde(default)]
    pub tts: TtsSettings,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.narration.prefetch_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "narration.prefetch_depth".to_string(),
                message: "Prefetch depth must be at least 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.narration.volume) {
            return Err(ConfigError::InvalidValue {
                field: "narration.volume".to_string(),
                message: "Volume must be within 0.0..=1.0".to_string(),
            });
        }

        if self.narration.playback_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "narration.playback_rate".to_string(),
                message: "Playback rate must be positive".to_string(),
            });
        }

        if self.narration.synthesis_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "narration.synthesis_timeout_secs".to_string(),
                message: "Synthesis timeout must be nonzero".to_string(),
            });
        }

        let defaults = self
            .tts
            .providers
            .iter()
            .filter(|p| p.is_default && p.enabled)
            .count();
        if defaults > 1 {
            return Err(ConfigError::InvalidValue {
                field: "tts.providers".to_string(),
                message: "At most one enabled provider may be the default".to_string(),
            });
        }

        for clone in &self.tts.voice_clones {
            if !self.tts.providers.iter().any(|p| p.id == clone.provider_id) {
                tracing::warn!(
                    "Voice clone '{}' references unknown provider {}",
                    clone.name,
                    clone.provider_id
                );
            }
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (NARRATOR__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("NARRATOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}
