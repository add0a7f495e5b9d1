//! Configuration for the narration engine
//!
//! Layered loading, highest priority first:
//! 1. Environment variables (`NARRATOR__` prefix, `__` separator)
//! 2. `config/{env}.yaml` (if an environment name is given)
//! 3. `config/default.yaml`

mod narration;
mod providers;
mod settings;

pub use narration::NarrationConfig;
pub use providers::{
    GenerationConfig, TtsProviderConfig, TtsProviderType, TtsSettings, VoiceCloneConfig,
};
pub use settings::{load_settings, Settings};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
