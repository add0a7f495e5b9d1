//! Typed episode generation events

use narrator_core::EpisodeComplete;

use crate::frame::Frame;

/// One decoded generation event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Generation began for an episode.
    Start { episode_id: Option<i64> },
    /// Raw text fragment to append to the transcript.
    Token(String),
    /// One complete sentence, ready to queue for narration.
    Sentence(String),
    /// Generation finished.
    Complete(EpisodeComplete),
    /// The upstream reported a generation error.
    Error(String),
}

impl From<Frame> for StreamEvent {
    /// Unrecognized event names fall back to `Token`: silently discarding
    /// bytes would corrupt the episode text. The flip side is that a future
    /// non-text upstream event will garble the transcript until it is
    /// mapped here.
    fn from(frame: Frame) -> Self {
        match frame.event.as_str() {
            "start" => StreamEvent::Start {
                episode_id: frame.data.trim().parse().ok(),
            },
            "token" => StreamEvent::Token(frame.data),
            "sentence" => StreamEvent::Sentence(frame.data),
            "complete" => match serde_json::from_str(&frame.data) {
                Ok(complete) => StreamEvent::Complete(complete),
                Err(err) => StreamEvent::Error(format!("malformed completion record: {err}")),
            },
            "error" => StreamEvent::Error(frame.data),
            _ => StreamEvent::Token(frame.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: &str) -> Frame {
        Frame {
            event: event.into(),
            data: data.into(),
        }
    }

    #[test]
    fn test_start_event() {
        let event = StreamEvent::from(frame("start", "42"));
        assert_eq!(
            event,
            StreamEvent::Start {
                episode_id: Some(42)
            }
        );

        let event = StreamEvent::from(frame("start", "not-a-number"));
        assert_eq!(event, StreamEvent::Start { episode_id: None });
    }

    #[test]
    fn test_complete_event_parses_record() {
        let data = r#"{"episode_id": 7, "title": "The Gate", "word_count": 1250}"#;
        match StreamEvent::from(frame("complete", data)) {
            StreamEvent::Complete(complete) => {
                assert_eq!(complete.episode_id, 7);
                assert_eq!(complete.title, "The Gate");
                assert_eq!(complete.word_count, 1250);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_complete_surfaces_error() {
        let event = StreamEvent::from(frame("complete", "{broken"));
        assert!(matches!(event, StreamEvent::Error(_)));
    }

    #[test]
    fn test_unknown_event_falls_back_to_token() {
        let event = StreamEvent::from(frame("metadata", "some payload"));
        assert_eq!(event, StreamEvent::Token("some payload".into()));
    }

    #[test]
    fn test_token_preserves_leading_whitespace() {
        let event = StreamEvent::from(frame("token", " the next word"));
        assert_eq!(event, StreamEvent::Token(" the next word".into()));
    }
}
