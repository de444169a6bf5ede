//! Chat stream decoding
//!
//! The backend answers a chat message with a newline-delimited event
//! stream. Each line is a JSON object tagged by its `event` field. Older
//! backends wrote Python-style dict literals with single quotes; those
//! lines are accepted through a naive quote substitution when strict
//! JSON decoding fails.
//!
//! - [`StreamEvent`]: one decoded line
//! - [`decode_line`]: strict-then-legacy line decoding
//! - [`reader::EventStream`]: async stream of events over a response body

pub mod reader;

pub use reader::{EventStream, LineSplitter};

use serde::{Deserialize, Serialize};

/// One event from the chat stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Stream opened for a conversation
    Start {
        #[serde(default)]
        conversation_id: Option<String>,
    },
    /// A chunk of message text
    Message {
        #[serde(default = "default_role")]
        role: String,
        #[serde(default)]
        content: String,
    },
    /// The backend finished answering
    Done,
    /// The backend failed while answering
    Error {
        #[serde(default)]
        message: String,
    },
}

fn default_role() -> String {
    "assistant".to_string()
}

impl StreamEvent {
    /// True for `done` and `error`, after which no more text follows
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Assistant text carried by a `message` event, if any
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            StreamEvent::Message { role, content } if role == "assistant" && !content.is_empty() => {
                Some(content.as_str())
            }
            _ => None,
        }
    }
}

/// Decode one stream line
///
/// Strict JSON is always tried first. Only when it fails is the legacy
/// single-quote encoding attempted. Returns `None` for blank lines and
/// for lines neither decoding accepts.
///
/// # Examples
///
/// ```
/// use tripplanner::stream::{decode_line, StreamEvent};
///
/// assert_eq!(decode_line(r#"{"event": "done"}"#), Some(StreamEvent::Done));
/// assert_eq!(decode_line("{'event': 'done'}"), Some(StreamEvent::Done));
/// assert_eq!(decode_line("not json {{"), None);
/// ```
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(line) {
        Ok(event) => Some(event),
        Err(strict_err) => {
            let legacy = line.replace('\'', "\"");
            match serde_json::from_str::<StreamEvent>(&legacy) {
                Ok(event) => {
                    tracing::debug!("Decoded legacy stream line after strict failure: {}", strict_err);
                    Some(event)
                }
                Err(_) => None,
            }
        }
    }
}
