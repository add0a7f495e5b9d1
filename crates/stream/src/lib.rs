//! Episode text streaming
//!
//! Features:
//! - Incremental SSE frame decoding tolerant of arbitrary read boundaries
//! - Typed generation events with a forward-compatible text fallback
//! - Streaming client for the episode generation service
//! - Transcript accumulation for wholesale re-queuing

pub mod client;
pub mod event;
pub mod frame;
pub mod transcript;

pub use client::{AbortHandle, GenerateRequest, GenerationClient};
pub use event::StreamEvent;
pub use frame::{Frame, FrameParser};
pub use transcript::TranscriptBuffer;
