//! Chat session: store, dispatcher and poller wired together
//!
//! [`ChatSession::submit`] runs one user query end to end: dispatch the
//! message, poll for the itinerary once the stream is done, and keep
//! dispatching reformulated retries while the poller asks for them. The
//! retry cycle is an explicit loop, so a retry can never re-arm itself
//! beyond the poller's attempt cap.

pub mod dispatcher;
pub mod persistence;
pub mod poller;
pub mod store;

pub use dispatcher::{DispatchKind, DispatchOutcome, MessageDispatcher};
pub use persistence::{KeyValueStore, MemoryStore, SledStore};
pub use poller::{ItineraryPoller, PollDecision, PollerState, RetryContext};
pub use store::{ChatMessage, ConversationStore, ItineraryState, Sender, StoreChange, StoreObserver};

use std::sync::Arc;

use crate::api::{ChatBackend, Location};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::map::{marker_for_location, MapMarker};

/// Everything that happened during one [`ChatSession::submit`]
#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    /// The user dispatch followed by any retry dispatches
    pub dispatches: Vec<DispatchOutcome>,
    /// Poller decisions in order
    pub decisions: Vec<PollDecision>,
}

impl SubmitReport {
    /// Number of automatic retries dispatched
    pub fn retries(&self) -> usize {
        self.dispatches.len().saturating_sub(1)
    }

    /// Last poller decision, if the itinerary was polled at all
    pub fn final_decision(&self) -> Option<&PollDecision> {
        self.decisions.last()
    }
}

/// A conversation with the planning backend
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    store: ConversationStore,
    dispatcher: MessageDispatcher,
    poller: ItineraryPoller,
    markers: Vec<MapMarker>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("store", &self.store)
            .field("poller", &self.poller.state())
            .field("markers", &self.markers.len())
            .finish()
    }
}

impl ChatSession {
    /// Create a session
    ///
    /// # Arguments
    ///
    /// * `backend` - Planning backend
    /// * `config` - Greeting, fallback text and retry policy
    /// * `persistence` - Where the conversation id is kept
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        config: &ChatConfig,
        persistence: Box<dyn KeyValueStore>,
    ) -> Self {
        Self {
            backend,
            store: ConversationStore::new(config.greeting.clone(), persistence),
            dispatcher: MessageDispatcher::new(config.fallback_message.clone()),
            poller: ItineraryPoller::new(&config.retry),
            markers: Vec::new(),
        }
    }

    /// Conversation state
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Mutable conversation state
    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    /// Register a store observer
    pub fn subscribe(&mut self, observer: Arc<dyn StoreObserver>) {
        self.store.subscribe(observer);
    }

    /// Itinerary poller
    pub fn poller(&self) -> &ItineraryPoller {
        &self.poller
    }

    /// Markers currently shown on the map
    pub fn markers(&self) -> &[MapMarker] {
        &self.markers
    }

    /// Replace the map markers
    pub fn set_markers(&mut self, markers: Vec<MapMarker>) {
        self.markers = markers;
    }

    /// Show a single itinerary location on the map
    ///
    /// Returns `false`, leaving the markers untouched, when the location
    /// has no coordinates.
    pub fn focus_location(&mut self, location: &Location) -> bool {
        match marker_for_location(location) {
            Some(marker) => {
                self.markers = vec![marker];
                true
            }
            None => false,
        }
    }

    /// Send a user query and reconcile the itinerary
    ///
    /// Backend failures end up in the transcript, not in the result.
    ///
    /// # Errors
    ///
    /// Fails only for blank text or while a previous message is still
    /// being answered; the session is left untouched in both cases.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitReport> {
        let backend = Arc::clone(&self.backend);

        let outcome = self
            .dispatcher
            .dispatch(&mut self.store, backend.as_ref(), text, DispatchKind::User)
            .await?;
        self.poller.begin_query(text);

        let mut report = SubmitReport::default();
        let mut completed = outcome.completed;
        report.dispatches.push(outcome);

        while completed {
            let decision = self.poller.poll(&mut self.store, backend.as_ref()).await;
            report.decisions.push(decision.clone());

            match decision {
                PollDecision::Resolved { markers } => {
                    self.markers = markers;
                    break;
                }
                PollDecision::Retry { prompt, delay, .. } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let outcome = self
                        .dispatcher
                        .dispatch(&mut self.store, backend.as_ref(), &prompt, DispatchKind::Retry)
                        .await?;
                    completed = outcome.completed;
                    report.dispatches.push(outcome);
                }
                PollDecision::Idle | PollDecision::GaveUp { .. } => break,
            }
        }

        tracing::debug!(
            "Submit finished after {} dispatch(es), final decision {:?}",
            report.dispatches.len(),
            report.final_decision()
        );
        Ok(report)
    }

    /// Pick up an itinerary for a restored conversation
    ///
    /// Polls once when a conversation id exists and no itinerary is marked
    /// done. Never retries, since no query was sent in this session.
    pub async fn resume(&mut self) -> PollDecision {
        if self.store.conversation_id().is_none() || self.store.itinerary().is_done {
            return PollDecision::Idle;
        }
        let backend = Arc::clone(&self.backend);
        let decision = self.poller.poll(&mut self.store, backend.as_ref()).await;
        if let PollDecision::Resolved { markers } = &decision {
            self.markers = markers.clone();
        }
        decision
    }

    /// Start over: transcript, itinerary, markers, retry state and stored id
    pub fn reset(&mut self) {
        self.store.reset();
        self.poller.reset();
        self.markers.clear();
    }
}
