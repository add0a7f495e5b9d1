//! Audio rendering abstraction
//!
//! The host environment supplies the actual audio output: something that
//! can load a resolved audio handle, play it, and report finished or
//! failed. Exactly one render resource exists at a time, owned by the
//! engine task; volume and rate are continuously-applied parameters, not
//! state-machine inputs.

use async_trait::async_trait;

use narrator_core::AudioHandle;

/// Continuously-applied render parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub volume: f32,
    pub rate: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            rate: 1.0,
        }
    }
}

/// Outcome of rendering one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Playback reached the end of the audio.
    Finished,
    /// The render target failed or was aborted.
    Failed(String),
}

/// Host-provided audio output.
#[async_trait]
pub trait AudioRenderer: Send + Sync {
    /// Load and play one resolved audio handle to completion.
    async fn render(&self, audio: &AudioHandle, params: RenderParams) -> RenderOutcome;

    /// Apply a new volume to the current and future renders.
    fn set_volume(&self, volume: f32);

    /// Apply a new playback rate to the current and future renders.
    fn set_rate(&self, rate: f32);

    /// Best-effort abort of the active render. The pending `render` call
    /// still resolves; the engine drops its outcome by version checking.
    fn cancel(&self);
}
