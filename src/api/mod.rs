//! Planning backend access
//!
//! [`ApiClient`] speaks HTTP to the backend. The chat session only needs
//! three of its calls, so those sit behind the [`ChatBackend`] trait and
//! tests can swap in an in-process fake.

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::EventStream;

/// The backend calls a chat session depends on
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Post a user message. `None` asks the backend to start a conversation.
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatMessageResponse>;

    /// Open the event stream for a posted message
    ///
    /// # Errors
    ///
    /// Fails when the stream answers with a non-success status or without
    /// a body. Errors after the stream is open end the stream instead.
    async fn open_stream(&self, stream_url: &str) -> Result<EventStream>;

    /// Fetch the backend-side state of a conversation
    async fn conversation_state(&self, conversation_id: &str) -> Result<ConversationState>;
}
