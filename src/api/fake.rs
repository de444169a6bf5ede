//! In-process fake backend for session unit tests
//!
//! [`FakeBackend`] implements [`ChatBackend`] from scripted data:
//!
//! - Each `open_stream` call pops the next scripted list of raw lines and
//!   feeds them through the real stream reader.
//! - Each `conversation_state` call pops the next scripted state.
//! - Every `send_message` call is recorded for later assertions.
//!
//! Empty scripts fall back to a bare `done` stream and a default state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::types::{ChatMessageResponse, ConversationState, TripPlan};
use super::ChatBackend;
use crate::error::{Result, TripPlannerError};
use crate::stream::EventStream;

/// A recorded `send_message` call
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub content: String,
    pub conversation_id: Option<String>,
}

/// Scripted [`ChatBackend`] for tests
#[derive(Debug)]
pub struct FakeBackend {
    conversation_id: String,
    assigned: Mutex<Option<String>>,
    sent: Mutex<Vec<SentMessage>>,
    streams: Mutex<VecDeque<Vec<String>>>,
    states: Mutex<VecDeque<Result<ConversationState>>>,
    fail_send: AtomicBool,
    fail_stream: AtomicBool,
    state_calls: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new("conv-fake")
    }
}

impl FakeBackend {
    /// Backend that assigns `conversation_id` to new conversations
    pub fn new(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            assigned: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            streams: Mutex::new(VecDeque::new()),
            states: Mutex::new(VecDeque::new()),
            fail_send: AtomicBool::new(false),
            fail_stream: AtomicBool::new(false),
            state_calls: AtomicUsize::new(0),
        }
    }

    /// Queue the raw lines of the next stream
    pub fn push_stream(&self, lines: &[&str]) {
        self.streams
            .lock()
            .unwrap()
            .push_back(lines.iter().map(|l| l.to_string()).collect());
    }

    /// Queue a stream of assistant chunks followed by `done`
    pub fn push_reply(&self, chunks: &[&str]) {
        let mut lines: Vec<String> = chunks
            .iter()
            .map(|c| {
                serde_json::json!({"event": "message", "role": "assistant", "content": c})
                    .to_string()
            })
            .collect();
        lines.push(r#"{"event": "done"}"#.to_string());
        self.streams.lock().unwrap().push_back(lines);
    }

    /// Queue the next conversation state
    pub fn push_state(&self, state: ConversationState) {
        self.states.lock().unwrap().push_back(Ok(state));
    }

    /// Queue a finished state whose plan has no days
    pub fn push_empty_plan(&self) {
        self.push_state(ConversationState {
            itinerary_done: true,
            trip_plan: Some(TripPlan::default()),
        });
    }

    /// Queue a failing state fetch
    pub fn push_state_error(&self, message: &str) {
        self.states
            .lock()
            .unwrap()
            .push_back(Err(TripPlannerError::Api {
                status: 500,
                body: message.to_string(),
            }
            .into()));
    }

    /// Answer every following send with `id`, whatever the client asked for
    pub fn assign_conversation_id(&self, id: &str) {
        *self.assigned.lock().unwrap() = Some(id.to_string());
    }

    /// Make every following `send_message` fail
    pub fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    /// Make every following `open_stream` fail
    pub fn fail_streams(&self) {
        self.fail_stream.store(true, Ordering::SeqCst);
    }

    /// All messages sent so far
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of state fetches so far
    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatMessageResponse> {
        self.sent.lock().unwrap().push(SentMessage {
            content: content.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        });
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(TripPlannerError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }
            .into());
        }
        let assigned = self.assigned.lock().unwrap().clone();
        let conversation_id = assigned
            .or_else(|| conversation_id.map(str::to_string))
            .unwrap_or_else(|| self.conversation_id.clone());
        let index = self.sent.lock().unwrap().len();
        Ok(ChatMessageResponse {
            stream_url: format!("/api/chat/stream/{}", index),
            message_id: format!("msg-{}", index),
            conversation_id,
        })
    }

    async fn open_stream(&self, _stream_url: &str) -> Result<EventStream> {
        if self.fail_stream.load(Ordering::SeqCst) {
            return Err(TripPlannerError::Stream("status 500".to_string()).into());
        }
        let lines = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![r#"{"event": "done"}"#.to_string()]);
        let chunks: Vec<std::result::Result<Bytes, String>> = lines
            .into_iter()
            .map(|l| Ok(Bytes::from(format!("{}\n", l))))
            .collect();
        Ok(EventStream::from_byte_stream(futures::stream::iter(chunks)))
    }

    async fn conversation_state(&self, _conversation_id: &str) -> Result<ConversationState> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ConversationState::default()))
    }
}
