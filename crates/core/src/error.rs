//! Error types for the narration engine

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the narration engine
#[derive(Error, Debug)]
pub enum Error {
    // Episode text stream errors
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    // Audio generation errors
    #[error("TTS error: {0}")]
    Tts(#[from] TtsError),

    // Engine control errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Errors terminating an episode text stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// Caller-initiated cancellation. Terminal, but not a failure: the
    /// caller ended the stream and no error should be surfaced.
    #[error("stream aborted by caller")]
    Aborted,

    /// Network or transport failure. Surfaced to the caller who initiated
    /// generation; already-received text stays intact.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The upstream violated the frame protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl StreamError {
    /// Whether this terminal signal is a caller abort rather than a failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, StreamError::Aborted)
    }
}

/// Errors from audio synthesis
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("synthesis timed out after {0}ms")]
    Timeout(u64),

    #[error("unknown provider: {0}")]
    UnknownProvider(i64),

    #[error("provider does not support {0}")]
    Unsupported(&'static str),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Engine control-channel errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine task has shut down and can no longer accept commands.
    #[error("engine task has shut down")]
    ChannelClosed,
}
