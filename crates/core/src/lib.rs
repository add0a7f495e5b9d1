//! Core types for the narration engine
//!
//! This crate provides foundational types used across all other crates:
//! - Playback units and resolved audio handles
//! - Generation epoch tokens
//! - Error taxonomy

pub mod error;
pub mod types;

pub use error::{EngineError, Error, Result, StreamError, TtsError};
pub use types::{AudioHandle, EpisodeComplete, GenerationEpoch, PlaybackUnit};
