//! Message dispatcher
//!
//! Turns one user utterance into a backend round trip: typing on, send,
//! open the stream, feed events into the store, typing off. Any backend
//! failure along the way becomes a single fallback assistant message.

use futures::StreamExt;

use super::store::{ChatMessage, ConversationStore};
use crate::api::ChatBackend;
use crate::error::{Result, TripPlannerError};
use crate::stream::StreamEvent;

/// How a message enters the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    /// Typed by the user; echoed into the transcript
    User,
    /// Reformulated automatically after an empty itinerary; not echoed
    Retry,
}

/// Summary of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Conversation the message went to
    pub conversation_id: String,
    /// A `done` event was received
    pub completed: bool,
    /// The send or the stream failed and the fallback message was shown
    pub failed: bool,
    /// Events decoded from the stream
    pub events: usize,
    /// Stream lines neither decoding accepted
    pub dropped_lines: usize,
}

/// Sends user text to the backend and streams the answer into the store
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    fallback_message: String,
}

impl MessageDispatcher {
    /// Create a dispatcher that shows `fallback_message` on failure
    pub fn new(fallback_message: impl Into<String>) -> Self {
        Self {
            fallback_message: fallback_message.into(),
        }
    }

    /// Dispatch `text` and stream the reply into `store`
    ///
    /// Backend failures never surface as errors; they are turned into the
    /// fallback message and reported through [`DispatchOutcome::failed`].
    ///
    /// # Errors
    ///
    /// Returns [`TripPlannerError::EmptyMessage`] for blank text and
    /// [`TripPlannerError::Busy`] while a previous dispatch is still
    /// typing. Neither case touches the store.
    pub async fn dispatch(
        &self,
        store: &mut ConversationStore,
        backend: &dyn ChatBackend,
        text: &str,
        kind: DispatchKind,
    ) -> Result<DispatchOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TripPlannerError::EmptyMessage.into());
        }
        if store.is_typing() {
            return Err(TripPlannerError::Busy.into());
        }

        if kind == DispatchKind::User {
            store.add_message(ChatMessage::user(text), false);
        }
        let conversation_id = store.ensure_conversation_id();

        store.set_typing(true);
        let result = self.round_trip(store, backend, text, &conversation_id).await;
        store.set_typing(false);

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("Chat round trip failed: {:#}", e);
                store.add_message(ChatMessage::assistant(self.fallback_message.clone()), false);
                Ok(DispatchOutcome {
                    conversation_id: store
                        .conversation_id()
                        .map(str::to_string)
                        .unwrap_or(conversation_id),
                    failed: true,
                    ..Default::default()
                })
            }
        }
    }

    async fn round_trip(
        &self,
        store: &mut ConversationStore,
        backend: &dyn ChatBackend,
        text: &str,
        conversation_id: &str,
    ) -> Result<DispatchOutcome> {
        let response = backend.send_message(text, Some(conversation_id)).await?;

        let mut conversation_id = conversation_id.to_string();
        if !response.conversation_id.is_empty() && response.conversation_id != conversation_id {
            tracing::info!(
                "Backend assigned conversation {} (was {})",
                response.conversation_id,
                conversation_id
            );
            store.set_conversation_id(Some(&response.conversation_id));
            conversation_id = response.conversation_id.clone();
        }

        let mut stream = backend.open_stream(&response.stream_url).await?;

        let mut outcome = DispatchOutcome {
            conversation_id,
            ..Default::default()
        };
        let mut answering = false;

        while let Some(event) = stream.next().await {
            outcome.events += 1;
            match &event {
                StreamEvent::Start { conversation_id } => {
                    tracing::debug!("Stream started for {:?}", conversation_id);
                }
                StreamEvent::Message { .. } => {
                    if let Some(chunk) = event.assistant_text() {
                        if !answering {
                            // Empty reply first, so a chunk repeating the previous
                            // message still starts a message of its own.
                            store.add_message(ChatMessage::assistant(String::new()), false);
                            answering = true;
                        }
                        store.update_last_message(chunk);
                    }
                }
                StreamEvent::Error { message } => {
                    tracing::warn!("Backend reported stream error: {}", message);
                    let text = if message.is_empty() {
                        self.fallback_message.as_str()
                    } else {
                        message.as_str()
                    };
                    if answering {
                        store.set_last_assistant_message(text);
                    } else {
                        store.add_message(ChatMessage::assistant(text), false);
                    }
                    break;
                }
                StreamEvent::Done => {
                    outcome.completed = true;
                    break;
                }
            }
        }

        outcome.dropped_lines = stream.dropped_lines();
        if outcome.dropped_lines > 0 {
            tracing::warn!(
                "Dropped {} undecodable stream line(s)",
                outcome.dropped_lines
            );
        }
        Ok(outcome)
    }
}
