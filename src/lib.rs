//! Tripplanner - conversational travel planning client library
//!
//! This library talks to a trip-planning backend over HTTP, streams the
//! assistant's answer as newline-delimited JSON events, and reconciles the
//! itinerary the backend produces, retrying with reformulated prompts when
//! a plan comes back without any days.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: HTTP client, wire types and the `ChatBackend` trait
//! - `stream`: Stream event decoding and the byte-stream reader
//! - `session`: Conversation store, message dispatcher, itinerary poller
//! - `map`: Map markers and views derived from itineraries and search results
//! - `commands`: Terminal command handlers
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tripplanner::session::{ChatSession, MemoryStore};
//! use tripplanner::{ApiClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let client = Arc::new(ApiClient::new(&config.api)?);
//!     let mut session = ChatSession::new(client, &config.chat, Box::new(MemoryStore::new()));
//!     let report = session.submit("Plan a 3-day trip to Kyoto").await?;
//!     println!("{} marker(s) after {} retries", session.markers().len(), report.retries());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod map;
pub mod session;
pub mod stream;

// Re-export commonly used types
pub use api::{ApiClient, ChatBackend};
pub use config::Config;
pub use error::{Result, TripPlannerError};
pub use map::MapMarker;
pub use session::ChatSession;
pub use stream::StreamEvent;

#[cfg(test)]
pub mod test_utils;
