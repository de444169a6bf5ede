//! Itinerary poller
//!
//! After a stream finishes the backend may report the itinerary as done
//! while the plan has no days. The poller fetches the conversation state,
//! stores a populated plan, and otherwise asks for a bounded number of
//! reformulated retries before giving up with a manual-follow-up message.
//!
//! ```text
//! Idle -> Fetching -> Resolved
//!                  -> Retrying(n) -> (dispatch retry) -> Fetching ...
//!                  -> GaveUp
//! ```
//!
//! A failed state fetch counts as an empty plan.

use std::time::Duration;

use regex::Regex;

use super::store::{ChatMessage, ConversationStore};
use crate::api::{ChatBackend, ConversationState};
use crate::config::RetryConfig;
use crate::map::{markers_from_trip_plan, MapMarker};

/// Ordered destination patterns; the first match wins
const DESTINATION_PATTERNS: &[&str] = &[
    r"(?i)\btrip\s+to\s+(?P<dest>\p{L}[\p{L}\s'.-]*?)(?:\s+(?:for|with|from|on|in|during|next|this|over)\b|[,!?;]|$)",
    r"(?i)\b(?:visit|visiting|explore|exploring)\s+(?P<dest>\p{L}[\p{L}\s'.-]*?)(?:\s+(?:for|with|from|on|in|during|next|this|over)\b|[,!?;]|$)",
    r"\b(?i:in)\s+(?P<dest>\p{Lu}[\p{L}\s'.-]*?)(?:\s+(?i:for|with|from|on|during|next|this|over)\b|[,!?;]|$)",
    r"\b(?i:to)\s+(?P<dest>\p{Lu}[\p{L}\s'.-]*?)(?:\s+(?i:for|with|from|on|in|during|next|this|over)\b|[,!?;]|$)",
];

/// Where the poller is for the current query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
    Resolved,
    Retrying { attempt: u32 },
    GaveUp,
}

/// Retry bookkeeping for the current user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    pub last_query: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
}

/// What the caller should do after a poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollDecision {
    /// Nothing to do: the itinerary is not done yet, or there is no query to retry
    Idle,
    /// A populated plan was stored
    Resolved { markers: Vec<MapMarker> },
    /// Wait `delay`, then dispatch `prompt` as a retry
    Retry {
        attempt: u32,
        prompt: String,
        delay: Duration,
    },
    /// Retries are exhausted; `message` was posted to the transcript
    GaveUp { message: String },
}

/// Reconciles backend itinerary completion with the conversation store
#[derive(Debug)]
pub struct ItineraryPoller {
    retry: RetryContext,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    state: PollerState,
    patterns: Vec<Regex>,
}

impl ItineraryPoller {
    /// Create a poller with the given retry policy
    pub fn new(policy: &RetryConfig) -> Self {
        let patterns = DESTINATION_PATTERNS
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!("Invalid destination pattern {}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            retry: RetryContext {
                last_query: None,
                attempts: 0,
                max_attempts: policy.max_attempts,
            },
            initial_backoff_ms: policy.initial_backoff_ms,
            max_backoff_ms: policy.max_backoff_ms,
            state: PollerState::Idle,
            patterns,
        }
    }

    /// Current state
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Retry bookkeeping
    pub fn retry_context(&self) -> &RetryContext {
        &self.retry
    }

    /// Record a new user query and start a fresh retry cycle
    pub fn begin_query(&mut self, query: &str) {
        self.retry.last_query = Some(query.trim().to_string());
        self.retry.attempts = 0;
        self.state = PollerState::Idle;
    }

    /// Forget the query and any retry progress
    pub fn reset(&mut self) {
        self.retry.last_query = None;
        self.retry.attempts = 0;
        self.state = PollerState::Idle;
    }

    /// Fetch the conversation state and decide the next step
    pub async fn poll(
        &mut self,
        store: &mut ConversationStore,
        backend: &dyn ChatBackend,
    ) -> PollDecision {
        let Some(conversation_id) = store.conversation_id().map(str::to_string) else {
            self.state = PollerState::Idle;
            return PollDecision::Idle;
        };

        self.state = PollerState::Fetching;
        match backend.conversation_state(&conversation_id).await {
            Ok(state) => self.evaluate(store, state),
            Err(e) => {
                tracing::warn!("Fetching state for {} failed: {:#}", conversation_id, e);
                self.on_empty_plan(store)
            }
        }
    }

    /// Decide the next step from a fetched state
    pub fn evaluate(&mut self, store: &mut ConversationStore, state: ConversationState) -> PollDecision {
        if !state.itinerary_done {
            tracing::debug!("Itinerary not done yet");
            self.state = PollerState::Idle;
            return PollDecision::Idle;
        }

        match state.trip_plan {
            Some(plan) if plan.has_days() => {
                let markers = markers_from_trip_plan(&plan);
                tracing::info!(
                    "Itinerary resolved: {} day(s), {} marker(s)",
                    plan.trip_plan.len(),
                    markers.len()
                );
                store.update_itinerary_data(Some(plan), true);
                self.retry.attempts = 0;
                self.state = PollerState::Resolved;
                PollDecision::Resolved { markers }
            }
            _ => self.on_empty_plan(store),
        }
    }

    fn on_empty_plan(&mut self, store: &mut ConversationStore) -> PollDecision {
        let Some(query) = self.retry.last_query.clone() else {
            tracing::debug!("Empty itinerary without a recorded query, not retrying");
            self.state = PollerState::Idle;
            return PollDecision::Idle;
        };

        let destination = self.destination_for(&query);

        if self.retry.attempts < self.retry.max_attempts {
            self.retry.attempts += 1;
            let attempt = self.retry.attempts;
            let prompt = reformulate(&destination, attempt);
            let delay = self.backoff(attempt);
            tracing::warn!(
                "Empty itinerary for '{}', retry {}/{} in {:?}",
                destination,
                attempt,
                self.retry.max_attempts,
                delay
            );
            self.state = PollerState::Retrying { attempt };
            return PollDecision::Retry {
                attempt,
                prompt,
                delay,
            };
        }

        let message = gave_up_message(&destination);
        tracing::warn!(
            "Giving up on itinerary for '{}' after {} retries",
            destination,
            self.retry.attempts
        );
        store.add_message(ChatMessage::assistant(message.clone()), false);
        self.retry.attempts = 0;
        self.state = PollerState::GaveUp;
        PollDecision::GaveUp { message }
    }

    /// Delay before retry `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let cap = self.max_backoff_ms.max(self.initial_backoff_ms);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(u64::from(attempt.max(1)))
            .min(cap);
        Duration::from_millis(ms)
    }

    /// Destination phrase matched in a query, if any pattern recognises one
    pub fn extract_destination(&self, query: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            let dest = pattern.captures(query)?.name("dest")?;
            let dest = dest.as_str().trim().trim_end_matches('.').trim();
            (!dest.is_empty()).then(|| dest.to_string())
        })
    }

    /// Destination phrase derived from a query, or the query itself
    pub fn destination_for(&self, query: &str) -> String {
        self.extract_destination(query)
            .unwrap_or_else(|| query.trim().to_string())
    }

    /// Destination of the last recorded query
    pub fn current_destination(&self) -> Option<String> {
        self.retry
            .last_query
            .as_deref()
            .and_then(|q| self.extract_destination(q))
    }
}

/// Reformulated prompt for retry `attempt` (1-based)
///
/// Attempts cycle through attraction detail, popularity and local
/// experience phrasings.
pub fn reformulate(destination: &str, attempt: u32) -> String {
    match attempt.saturating_sub(1) % 3 {
        0 => format!(
            "Create a detailed day-by-day itinerary for {} with specific attractions, \
             landmarks and museums, giving each place its name and coordinates.",
            destination
        ),
        1 => format!(
            "What are the most popular things to see and do in {}? \
             Please organise them into a day-by-day trip plan.",
            destination
        ),
        _ => format!(
            "Plan a day-by-day trip to {} around local experiences: neighbourhoods, \
             markets and food spots, listing every stop as a named location.",
            destination
        ),
    }
}

/// Assistant message posted once retries are exhausted
pub fn gave_up_message(destination: &str) -> String {
    format!(
        "I couldn't put together a full itinerary for {dest} just now. You could try asking:\n\
         - \"Show me the top attractions in {dest}\"\n\
         - \"Suggest a 3-day itinerary for {dest}\"\n\
         - \"What are the best local experiences in {dest}?\"",
        dest = destination
    )
}
