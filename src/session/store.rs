//! Conversation store
//!
//! Single source of truth for the chat transcript, the active
//! conversation id, the itinerary snapshot and the typing flag. Every
//! mutation is an in-memory update; the only side effect is writing the
//! conversation id through the injected [`KeyValueStore`], and a failing
//! write is logged rather than returned.
//!
//! Observers registered with [`ConversationStore::subscribe`] see each
//! change as a [`StoreChange`] right after it is applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::persistence::{generate_conversation_id, KeyValueStore, CONVERSATION_ID_KEY};
use crate::api::TripPlan;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    /// Message written by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Message written by the assistant
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }

    fn same_as(&self, other: &ChatMessage) -> bool {
        self.sender == other.sender && self.text == other.text
    }
}

/// Itinerary snapshot. Both fields always change together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItineraryState {
    pub trip_plan: Option<TripPlan>,
    pub is_done: bool,
}

/// A change applied to the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// A message was appended at `index`
    MessageAdded { index: usize, message: ChatMessage },
    /// The seeded greeting was overwritten
    InitialReplaced { message: ChatMessage },
    /// Text was appended to the message at `index`
    MessageExtended { index: usize, delta: String },
    /// The message at `index` got new text
    MessageReplaced { index: usize, text: String },
    /// The typing flag changed
    Typing(bool),
    /// The itinerary snapshot was replaced
    ItineraryUpdated { is_done: bool },
    /// The conversation id was set or cleared
    ConversationIdChanged(Option<String>),
    /// The whole conversation was reset
    Reset,
}

/// Receives store changes
pub trait StoreObserver: Send + Sync {
    fn on_change(&self, change: &StoreChange);
}

/// Conversation state shared by the dispatcher, the poller and the front-end
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    conversation_id: Option<String>,
    itinerary: ItineraryState,
    typing: bool,
    first_message_processed: bool,
    greeting: Option<String>,
    persistence: Box<dyn KeyValueStore>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("messages", &self.messages)
            .field("conversation_id", &self.conversation_id)
            .field("itinerary", &self.itinerary)
            .field("typing", &self.typing)
            .field("first_message_processed", &self.first_message_processed)
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Create a store, restoring the persisted conversation id if any
    ///
    /// # Arguments
    ///
    /// * `greeting` - Assistant message seeded into the empty transcript
    /// * `persistence` - Where the conversation id lives between runs
    ///
    /// # Examples
    ///
    /// ```
    /// use tripplanner::session::persistence::MemoryStore;
    /// use tripplanner::session::store::{ChatMessage, ConversationStore};
    ///
    /// let mut store = ConversationStore::new(Some("Hi!".to_string()), Box::new(MemoryStore::new()));
    /// store.add_message(ChatMessage::user("Plan a trip"), false);
    /// store.add_message(ChatMessage::user("Plan a trip"), false);
    /// assert_eq!(store.messages().len(), 2);
    /// ```
    pub fn new(greeting: Option<String>, persistence: Box<dyn KeyValueStore>) -> Self {
        let conversation_id = match persistence.get(CONVERSATION_ID_KEY) {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!("Could not read stored conversation id: {}", e);
                None
            }
        };
        if let Some(id) = &conversation_id {
            tracing::debug!("Restored conversation id {}", id);
        }

        Self {
            messages: seed_messages(&greeting),
            conversation_id,
            itinerary: ItineraryState::default(),
            typing: false,
            first_message_processed: false,
            greeting,
            persistence,
            observers: Vec::new(),
        }
    }

    /// Register an observer for subsequent changes
    pub fn subscribe(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, change: StoreChange) {
        for observer in &self.observers {
            observer.on_change(&change);
        }
    }

    /// Transcript in insertion order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Most recent message
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Append a message unless it repeats the previous one
    ///
    /// With `replace_initial` set and no user message processed yet, the
    /// seeded greeting is overwritten instead. Returns `false` when the
    /// message was discarded as a duplicate.
    pub fn add_message(&mut self, message: ChatMessage, replace_initial: bool) -> bool {
        if message.sender == Sender::User {
            self.first_message_processed = true;
        }

        if replace_initial && !self.first_message_processed && self.only_greeting() {
            self.messages[0] = message.clone();
            self.notify(StoreChange::InitialReplaced { message });
            return true;
        }

        if let Some(last) = self.messages.last() {
            if last.same_as(&message) {
                tracing::debug!("Skipping duplicate {} message", message.sender);
                return false;
            }
        }

        self.messages.push(message.clone());
        let index = self.messages.len() - 1;
        self.notify(StoreChange::MessageAdded { index, message });
        true
    }

    fn only_greeting(&self) -> bool {
        match (&self.greeting, self.messages.as_slice()) {
            (Some(greeting), [first]) => first.sender == Sender::Assistant && &first.text == greeting,
            _ => false,
        }
    }

    /// Append `delta` to the most recent message. No-op on an empty transcript.
    pub fn update_last_message(&mut self, delta: &str) {
        let Some(last) = self.messages.last_mut() else {
            return;
        };
        last.text.push_str(delta);
        let index = self.messages.len() - 1;
        self.notify(StoreChange::MessageExtended {
            index,
            delta: delta.to_string(),
        });
    }

    /// Replace the text of the most recent assistant message
    ///
    /// Returns `false` when the transcript has no assistant message.
    pub fn set_last_assistant_message(&mut self, text: &str) -> bool {
        let Some(index) = self
            .messages
            .iter()
            .rposition(|m| m.sender == Sender::Assistant)
        else {
            return false;
        };
        self.messages[index].text = text.to_string();
        self.notify(StoreChange::MessageReplaced {
            index,
            text: text.to_string(),
        });
        true
    }

    /// Active conversation id
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Set or clear the conversation id in memory and in persistence
    ///
    /// `None` or an empty id clears both.
    pub fn set_conversation_id(&mut self, id: Option<&str>) {
        let id = id.filter(|id| !id.is_empty()).map(str::to_string);

        let persisted = match &id {
            Some(id) => self.persistence.set(CONVERSATION_ID_KEY, id),
            None => self.persistence.clear(CONVERSATION_ID_KEY),
        };
        if let Err(e) = persisted {
            tracing::warn!("Could not persist conversation id: {}", e);
        }

        self.conversation_id = id.clone();
        self.notify(StoreChange::ConversationIdChanged(id));
    }

    /// Current conversation id, restoring or creating one when absent
    pub fn ensure_conversation_id(&mut self) -> String {
        if let Some(id) = &self.conversation_id {
            return id.clone();
        }

        if let Ok(Some(id)) = self.persistence.get(CONVERSATION_ID_KEY) {
            if !id.is_empty() {
                self.conversation_id = Some(id.clone());
                return id;
            }
        }

        let id = generate_conversation_id();
        tracing::info!("Starting new conversation {}", id);
        self.set_conversation_id(Some(&id));
        id
    }

    /// Current itinerary snapshot
    pub fn itinerary(&self) -> &ItineraryState {
        &self.itinerary
    }

    /// Replace the itinerary snapshot
    pub fn update_itinerary_data(&mut self, trip_plan: Option<TripPlan>, is_done: bool) {
        self.itinerary = ItineraryState { trip_plan, is_done };
        self.notify(StoreChange::ItineraryUpdated { is_done });
    }

    /// Whether the assistant is answering
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Set the typing flag
    pub fn set_typing(&mut self, typing: bool) {
        if self.typing != typing {
            self.typing = typing;
            self.notify(StoreChange::Typing(typing));
        }
    }

    /// Whether a user message has been recorded since creation or reset
    pub fn first_message_processed(&self) -> bool {
        self.first_message_processed
    }

    /// Forget the conversation and start over from the greeting
    pub fn reset(&mut self) {
        self.messages = seed_messages(&self.greeting);
        self.itinerary = ItineraryState::default();
        self.typing = false;
        self.first_message_processed = false;
        self.set_conversation_id(None);
        self.notify(StoreChange::Reset);
    }
}

fn seed_messages(greeting: &Option<String>) -> Vec<ChatMessage> {
    greeting
        .iter()
        .map(|text| ChatMessage::assistant(text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::persistence::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<StoreChange>>,
    }

    impl StoreObserver for Recorder {
        fn on_change(&self, change: &StoreChange) {
            self.changes.lock().unwrap().push(change.clone());
        }
    }

    fn store() -> ConversationStore {
        ConversationStore::new(Some("Hi!".to_string()), Box::new(MemoryStore::new()))
    }

    fn bare_store() -> ConversationStore {
        ConversationStore::new(None, Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_new_store_is_seeded_with_greeting() {
        let store = store();
        assert_eq!(store.messages(), &[ChatMessage::assistant("Hi!")]);
        assert!(!store.is_typing());
        assert!(store.conversation_id().is_none());
    }

    #[test]
    fn test_adjacent_duplicates_are_skipped() {
        let mut store = bare_store();
        assert!(store.add_message(ChatMessage::user("a"), false));
        assert!(!store.add_message(ChatMessage::user("a"), false));
        assert!(store.add_message(ChatMessage::assistant("a"), false));
        assert!(store.add_message(ChatMessage::user("a"), false));
        assert_eq!(store.messages().len(), 3);
    }

    #[test]
    fn test_no_adjacent_duplicates_for_any_sequence() {
        let mut store = bare_store();
        let inputs = [
            ChatMessage::user("x"),
            ChatMessage::user("x"),
            ChatMessage::assistant("y"),
            ChatMessage::assistant("y"),
            ChatMessage::assistant("x"),
            ChatMessage::user("x"),
            ChatMessage::user("x"),
        ];
        for message in inputs {
            store.add_message(message, false);
        }
        for pair in store.messages().windows(2) {
            assert!(!(pair[0].sender == pair[1].sender && pair[0].text == pair[1].text));
        }
    }

    #[test]
    fn test_replace_initial_overwrites_greeting_once() {
        let mut store = store();
        assert!(store.add_message(ChatMessage::assistant("Planning..."), true));
        assert_eq!(store.messages(), &[ChatMessage::assistant("Planning...")]);

        store.add_message(ChatMessage::user("Go"), false);
        store.add_message(ChatMessage::assistant("Done"), true);
        assert_eq!(store.messages().len(), 3);
    }

    #[test]
    fn test_replace_initial_after_user_message_appends() {
        let mut store = store();
        store.add_message(ChatMessage::user("Go"), true);
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0], ChatMessage::assistant("Hi!"));
    }

    #[test]
    fn test_update_last_message_concatenates() {
        let mut store = bare_store();
        store.add_message(ChatMessage::assistant("t"), false);
        store.update_last_message("x");
        store.update_last_message("y");
        assert_eq!(store.last_message().unwrap().text, "txy");
    }

    #[test]
    fn test_update_last_message_on_empty_list() {
        let mut store = bare_store();
        store.update_last_message("x");
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_set_last_assistant_message_scans_backward() {
        let mut store = bare_store();
        store.add_message(ChatMessage::assistant("thinking..."), false);
        store.add_message(ChatMessage::user("hurry"), false);
        assert!(store.set_last_assistant_message("Here you go"));
        assert_eq!(store.messages()[0].text, "Here you go");
        assert_eq!(store.messages()[1].text, "hurry");
    }

    #[test]
    fn test_set_last_assistant_message_without_assistant() {
        let mut store = bare_store();
        store.add_message(ChatMessage::user("hi"), false);
        assert!(!store.set_last_assistant_message("x"));
    }

    #[test]
    fn test_conversation_id_persists_and_clears() {
        let persistence = std::sync::Arc::new(MemoryStore::new());
        struct Shared(std::sync::Arc<MemoryStore>);
        impl KeyValueStore for Shared {
            fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
                self.0.get(key)
            }
            fn set(&self, key: &str, value: &str) -> crate::error::Result<()> {
                self.0.set(key, value)
            }
            fn clear(&self, key: &str) -> crate::error::Result<()> {
                self.0.clear(key)
            }
        }

        let mut store = ConversationStore::new(None, Box::new(Shared(persistence.clone())));
        store.set_conversation_id(Some("c-42"));
        assert_eq!(
            persistence.get(CONVERSATION_ID_KEY).unwrap().as_deref(),
            Some("c-42")
        );

        let restored = ConversationStore::new(None, Box::new(Shared(persistence.clone())));
        assert_eq!(restored.conversation_id(), Some("c-42"));

        store.set_conversation_id(Some(""));
        assert!(store.conversation_id().is_none());
        assert_eq!(persistence.get(CONVERSATION_ID_KEY).unwrap(), None);
    }

    #[test]
    fn test_ensure_conversation_id_is_stable() {
        let mut store = bare_store();
        let first = store.ensure_conversation_id();
        assert_eq!(store.ensure_conversation_id(), first);
        assert_eq!(store.conversation_id(), Some(first.as_str()));
    }

    #[test]
    fn test_update_itinerary_sets_both_fields() {
        let mut store = bare_store();
        store.update_itinerary_data(Some(TripPlan::default()), true);
        assert!(store.itinerary().is_done);
        assert!(store.itinerary().trip_plan.is_some());
    }

    #[test]
    fn test_reset_restores_greeting_and_clears_id() {
        let mut store = store();
        store.set_conversation_id(Some("c-1"));
        store.add_message(ChatMessage::user("hi"), false);
        store.update_itinerary_data(Some(TripPlan::default()), true);
        store.reset();
        assert_eq!(store.messages(), &[ChatMessage::assistant("Hi!")]);
        assert!(store.conversation_id().is_none());
        assert!(!store.itinerary().is_done);
        assert!(!store.first_message_processed());
    }

    #[test]
    fn test_observer_sees_changes_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut store = bare_store();
        store.subscribe(recorder.clone());

        store.set_typing(true);
        store.add_message(ChatMessage::assistant("Sure"), false);
        store.update_last_message(", ok");
        store.set_typing(false);

        let changes = recorder.changes.lock().unwrap();
        assert_eq!(
            *changes,
            vec![
                StoreChange::Typing(true),
                StoreChange::MessageAdded {
                    index: 0,
                    message: ChatMessage::assistant("Sure")
                },
                StoreChange::MessageExtended {
                    index: 0,
                    delta: ", ok".to_string()
                },
                StoreChange::Typing(false),
            ]
        );
    }
}
