//! Streaming client for the episode generation service

use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use narrator_config::GenerationConfig;
use narrator_core::StreamError;

use crate::event::StreamEvent;
use crate::frame::FrameParser;

/// Request body for episode generation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateRequest {
    /// Optional authorial guidance for this episode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,

    /// Target episode length in words
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_words: Option<u32>,
}

/// Aborts an in-flight generation stream.
///
/// Firing it ends the stream with `StreamError::Aborted`, which callers
/// treat as a clean end, not a failure. Dropping the handle without firing
/// leaves the stream running to completion.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Resolves when the abort handle fires; pends forever if the handle was
/// dropped without firing.
async fn aborted(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// HTTP client for the story generation service.
pub struct GenerationClient {
    http: Client,
    base_url: String,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, StreamError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.stream_timeout_secs))
            .build()
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Begin generating the next episode of a story.
    ///
    /// Returns an abort handle and a lazy, ordered event stream. The stream
    /// terminates with at most one `Err`: `StreamError::Aborted` when the
    /// caller fired the handle, `StreamError::Transport` on a network
    /// failure. Events already yielded are never rolled back.
    pub fn generate_episode(
        &self,
        story_id: i64,
        request: GenerateRequest,
    ) -> (
        AbortHandle,
        impl Stream<Item = Result<StreamEvent, StreamError>>,
    ) {
        let (abort_tx, mut abort_rx) = watch::channel(false);
        let url = format!(
            "{}/api/stories/{}/episodes/generate",
            self.base_url, story_id
        );
        let http = self.http.clone();

        let events = stream! {
            let response = tokio::select! {
                biased;
                _ = aborted(&mut abort_rx) => {
                    debug!("generation aborted before the stream opened");
                    yield Err(StreamError::Aborted);
                    return;
                }
                response = http.post(&url).json(&request).send() => response,
            };

            let response = match response.and_then(|r| r.error_for_status()) {
                Ok(response) => response,
                Err(err) => {
                    warn!("generation request failed: {err}");
                    yield Err(StreamError::Transport(err.to_string()));
                    return;
                }
            };

            let mut parser = FrameParser::new();
            let mut body = response.bytes_stream();
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = aborted(&mut abort_rx) => {
                        debug!("generation stream aborted by caller");
                        yield Err(StreamError::Aborted);
                        return;
                    }
                    chunk = body.next() => chunk,
                };

                match chunk {
                    Some(Ok(bytes)) => {
                        for frame in parser.push(&bytes) {
                            yield Ok(StreamEvent::from(frame));
                        }
                    }
                    Some(Err(err)) => {
                        warn!("generation transport failure: {err}");
                        yield Err(StreamError::Transport(err.to_string()));
                        return;
                    }
                    None => {
                        if let Some(frame) = parser.finish() {
                            yield Ok(StreamEvent::from(frame));
                        }
                        return;
                    }
                }
            }
        };

        (AbortHandle { tx: abort_tx }, events)
    }
}
