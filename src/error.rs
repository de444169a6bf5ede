//! Error types for Tripplanner
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Tripplanner operations
///
/// Covers configuration loading, backend HTTP calls, stream decoding,
/// conversation id persistence, and map rendering prerequisites.
#[derive(Error, Debug)]
pub enum TripPlannerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Stream could not be opened or had no body
    #[error("Stream error: {0}")]
    Stream(String),

    /// A command argument was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Message text was empty or whitespace only
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// A send is already in flight for this conversation
    #[error("Assistant is still responding")]
    Busy,

    /// Conversation id persistence errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Map rendering requested without a maps provider key
    #[error("Missing maps API key (set TRIPPLANNER_MAPS_API_KEY or maps.api_key)")]
    MissingMapsApiKey,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedded key-value store errors
    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),
}

/// Result type alias for Tripplanner operations
///
/// Uses `anyhow::Error` so that call sites can attach context while
/// still being able to downcast to [`TripPlannerError`].
pub type Result<T> = anyhow::Result<T>;
