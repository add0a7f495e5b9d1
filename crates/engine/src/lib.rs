//! Real-time narration playback engine
//!
//! Drives audiobook-style narration over an incrementally-built queue of
//! sentence units:
//! - bounded look-ahead prefetch of synthesized audio
//! - strictly ordered, gapless playback regardless of arrival order
//! - version-based discarding of stale async results under stop, episode
//!   navigation, and regeneration

pub mod driver;
pub mod engine;
pub mod prefetch;
pub mod queue;
pub mod render;
pub mod segment;
pub mod session;

pub use driver::DriverState;
pub use engine::{EngineSnapshot, NarrationEvent, Narrator};
pub use prefetch::PrefetchScheduler;
pub use queue::PlaybackQueue;
pub use render::{AudioRenderer, RenderOutcome, RenderParams};
pub use segment::segment_content;
pub use session::SessionController;
