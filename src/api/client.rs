//! HTTP client for the planning backend
//!
//! Every JSON endpoint the client uses goes through [`ApiClient`]. A
//! non-success status becomes [`TripPlannerError::Api`] carrying the
//! status and the response text; the chat stream is the exception and
//! fails with [`TripPlannerError::Stream`].
//!
//! The stream is opened through a separate client that only bounds the
//! connect phase: a reply may take longer than any JSON request.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::*;
use super::ChatBackend;
use crate::config::ApiConfig;
use crate::error::{Result, TripPlannerError};
use crate::stream::EventStream;

/// Client for the planning backend REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    stream_client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `config` - Backend connection settings
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TripPlannerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let stream_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                TripPlannerError::Config(format!("Failed to create stream HTTP client: {}", e))
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::info!("Initialized planning backend client: base_url={}", base_url);

        Ok(Self {
            client,
            stream_client,
            base_url,
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a possibly relative backend URL into an absolute one
    ///
    /// Absolute URLs are returned unchanged. Anything else is appended to
    /// the base URL, so a base with a path prefix keeps it.
    pub fn resolve_url(&self, url: &str) -> String {
        if url::Url::parse(url).is_ok() {
            return url.to_string();
        }
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    /// Absolute URL for `segments` below the base URL, each one percent-encoded
    ///
    /// Use this when a segment comes from the backend or the user, such as
    /// a conversation id.
    pub fn endpoint(&self, segments: &[&str]) -> Result<String> {
        let mut url = url::Url::parse(&self.base_url).map_err(|e| {
            TripPlannerError::Config(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                TripPlannerError::Config(format!("Base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.resolve_url(path))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("Request for {} failed: {}", what, e);
            TripPlannerError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Backend returned error {} for {}: {}", status, what, body);
            return Err(TripPlannerError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed = response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", what, e);
            TripPlannerError::Http(e)
        })?;
        Ok(parsed)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.send_json(self.request(Method::GET, path).query(query), path)
            .await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.request(Method::POST, path).json(body), path)
            .await
    }

    /// Post a chat message
    ///
    /// The returned `stream_url` is already absolute.
    pub async fn post_chat_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatMessageResponse> {
        let request = ChatMessageRequest {
            content: content.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        };
        let mut response: ChatMessageResponse =
            self.post_json("/api/chat/messages", &request).await?;
        response.stream_url = self.resolve_url(&response.stream_url);
        tracing::debug!(
            "Posted message {} to conversation {}",
            response.message_id,
            response.conversation_id
        );
        Ok(response)
    }

    /// Open the newline-delimited event stream for a posted message
    ///
    /// # Errors
    ///
    /// Returns [`TripPlannerError::Stream`] if the request fails, the status
    /// is not a success, or the response carries no body
    pub async fn open_event_stream(&self, stream_url: &str) -> Result<EventStream> {
        let url = self.resolve_url(stream_url);
        let response = self
            .stream_client
            .get(&url)
            .send()
            .await
            .map_err(|e| TripPlannerError::Stream(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Stream {} answered {}", url, status);
            return Err(TripPlannerError::Stream(format!("status {}", status.as_u16())).into());
        }
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Err(TripPlannerError::Stream("response has no body".to_string()).into());
        }

        tracing::debug!("Opened chat stream {}", url);
        Ok(EventStream::from_byte_stream(response.bytes_stream()))
    }

    /// Fetch the backend state of a conversation
    pub async fn get_conversation_state(&self, conversation_id: &str) -> Result<ConversationState> {
        let path = self.endpoint(&["api", "chat", "conversations", conversation_id, "state"])?;
        let response: ConversationStateResponse = self.get_json(&path, &[]).await?;
        Ok(response.state)
    }

    /// List the stored messages of a conversation
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let response: MessagesResponse = self
            .get_json("/api/chat/messages", &[("conversation_id", conversation_id)])
            .await?;
        Ok(response.messages)
    }

    /// Ask the backend to stop answering in a conversation
    pub async fn stop(&self, conversation_id: &str) -> Result<serde_json::Value> {
        self.send_json(
            self.request(Method::POST, "/api/chat/stop")
                .query(&[("conversation_id", conversation_id)]),
            "/api/chat/stop",
        )
        .await
    }

    /// Search flights
    pub async fn search_flights(&self, request: &FlightSearchRequest) -> Result<FlightSearchResponse> {
        self.post_json("/api/search/flights", request).await
    }

    /// Search hotels
    pub async fn search_hotels(&self, request: &HotelSearchRequest) -> Result<HotelSearchResponse> {
        self.post_json("/api/search/hotels", request).await
    }

    /// Search points of interest around a location
    pub async fn search_poi(&self, request: &PoiSearchRequest) -> Result<ItemsResponse> {
        self.post_json("/api/search/poi", request).await
    }

    /// Look up booking destinations by name
    pub async fn booking_destinations(&self, query: &str) -> Result<ItemsResponse> {
        self.get_json("/api/booking/destinations", &[("query", query)])
            .await
    }

    /// Look up flight destinations by name
    pub async fn flight_destinations(&self, query: &str) -> Result<ItemsResponse> {
        self.get_json("/api/booking/flight-destinations", &[("query", query)])
            .await
    }

    /// Place suggestions from the maps provider
    pub async fn places_suggest(&self, query: &str) -> Result<ItemsResponse> {
        self.get_json("/api/places/suggest", &[("query", query)])
            .await
    }

    /// Create an itinerary run
    pub async fn create_itinerary(&self, payload: &serde_json::Value) -> Result<serde_json::Value> {
        self.post_json("/api/itineraries", payload).await
    }

    /// Fetch an itinerary by id
    pub async fn get_itinerary(&self, itinerary_id: &str) -> Result<serde_json::Value> {
        let path = self.endpoint(&["api", "itineraries", itinerary_id])?;
        self.get_json(&path, &[]).await
    }

    /// Run one agent planning turn
    pub async fn agent_plan(&self, request: &AgentPlanRequest) -> Result<AgentPlanOutcome> {
        let response: AgentPlanResponse = self.post_json("/api/agent/plan", request).await?;
        Ok(response.into())
    }

    /// Backend health report
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get_json("/api/health", &[]).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatMessageResponse> {
        self.post_chat_message(content, conversation_id).await
    }

    async fn open_stream(&self, stream_url: &str) -> Result<EventStream> {
        self.open_event_stream(stream_url).await
    }

    async fn conversation_state(&self, conversation_id: &str) -> Result<ConversationState> {
        self.get_conversation_state(conversation_id).await
    }
}
