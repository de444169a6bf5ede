//! Test utilities for Tripplanner
//!
//! Sample itineraries, session builders and assertion helpers shared by
//! the unit tests.

use crate::api::fake::FakeBackend;
use crate::api::{Coordinates, Day, Hotel, Location, TripPlan};
use crate::config::{ChatConfig, RetryConfig};
use crate::session::persistence::MemoryStore;
use crate::session::ChatSession;
use std::sync::Arc;

/// Location with both coordinates set
pub fn location(name: &str, lat: f64, lng: f64) -> Location {
    Location {
        name: name.to_string(),
        lat: Some(lat),
        lng: Some(lng),
        ..Default::default()
    }
}

/// Two-day Kyoto plan with one located stop per day and one hotel
pub fn sample_trip_plan() -> TripPlan {
    TripPlan {
        trip_plan: vec![
            Day {
                day: 1,
                locations: vec![location("Fushimi Inari Taisha", 34.9671, 135.7727)],
            },
            Day {
                day: 2,
                locations: vec![location("Arashiyama Bamboo Grove", 35.0170, 135.6713)],
            },
        ],
        stay_plan: vec![Hotel {
            name: "Hotel Kanra Kyoto".to_string(),
            coordinates: Some(Coordinates {
                lat: Some(34.9925),
                lng: Some(135.7578),
            }),
            rating: Some(4.6),
            ..Default::default()
        }],
    }
}

/// Chat settings with no greeting and zero retry delay
pub fn fast_chat_config() -> ChatConfig {
    ChatConfig {
        greeting: None,
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        ..Default::default()
    }
}

/// Session over a fake backend with in-memory persistence
pub fn fake_session(backend: Arc<FakeBackend>) -> ChatSession {
    ChatSession::new(backend, &fast_chat_config(), Box::new(MemoryStore::new()))
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TripPlannerError;

    #[test]
    fn test_sample_plan_has_two_days() {
        let plan = sample_trip_plan();
        assert!(plan.has_days());
        assert_eq!(plan.trip_plan.len(), 2);
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: crate::error::Result<()> =
            Err(TripPlannerError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }
}
