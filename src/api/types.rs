//! Wire types exchanged with the planning backend
//!
//! Field names follow the backend's JSON exactly. Types the client
//! reasons about (trip plans, conversation state) are strongly typed;
//! search results that are only displayed keep unknown fields in
//! `extra` so nothing the backend adds is lost.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of `POST /api/chat/messages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessageRequest {
    /// User text
    pub content: String,
    /// Conversation to append to; `None` asks the backend to create one
    pub conversation_id: Option<String>,
}

/// Response of `POST /api/chat/messages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessageResponse {
    /// Conversation the message was stored in
    pub conversation_id: String,
    /// Identifier of the stored user message
    pub message_id: String,
    /// Stream location; may be relative to the API base
    pub stream_url: String,
}

/// A single location inside a planned day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude. The backend spells it `lng` in trip plans.
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub distance_from_previous: Option<String>,
    #[serde(default)]
    pub travel_duration: Option<String>,
    #[serde(default)]
    pub estimated_visit_duration: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl Location {
    /// Both coordinates, when present and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One day of a trip plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Day {
    /// 1-based day number
    pub day: u32,
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// Coordinates attached to a hotel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// Price band for a hotel suggestion
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    #[serde(default)]
    pub range_min: Option<f64>,
    #[serde(default)]
    pub range_max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A hotel from the stay plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Hotel {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Structured itinerary produced by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TripPlan {
    #[serde(default)]
    pub trip_plan: Vec<Day>,
    #[serde(default)]
    pub stay_plan: Vec<Hotel>,
}

impl TripPlan {
    /// True when at least one day is planned
    pub fn has_days(&self) -> bool {
        !self.trip_plan.is_empty()
    }
}

/// Backend-side conversation state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    #[serde(default)]
    pub itinerary_done: bool,
    #[serde(default)]
    pub trip_plan: Option<TripPlan>,
}

/// Envelope of the conversation state endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationStateResponse {
    #[serde(default)]
    pub state: ConversationState,
}

/// A stored backend message from the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of `GET /api/chat/messages`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Geographic reference used by the search endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_type: Option<String>,
}

impl GeoLocation {
    /// Location identified by city name only
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            city: Some(name.into()),
            ..Default::default()
        }
    }

    /// Location identified by coordinates only
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }
}

/// Inclusive travel dates, ISO formatted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Result paging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

/// Money amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Money {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Body of `POST /api/search/flights`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    pub origin: GeoLocation,
    pub destination: GeoLocation,
    pub dates: DateRange,
    pub adults: u32,
    pub children: u32,
    pub currency: String,
}

/// One flight option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOption {
    pub id: String,
    pub carrier: String,
    pub depart_at: String,
    pub arrive_at: String,
    pub duration_minutes: u32,
    pub price: Money,
    #[serde(default)]
    pub deeplink: Option<String>,
}

/// Response of `POST /api/search/flights`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSearchResponse {
    #[serde(default)]
    pub options: Vec<FlightOption>,
}

/// Body of `POST /api/search/hotels`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelSearchRequest {
    pub destination: GeoLocation,
    pub dates: DateRange,
    pub rooms: u32,
    pub adults: u32,
    pub children: u32,
    pub currency: String,
    pub paging: Paging,
}

/// One hotel search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stars: Option<f64>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    pub price_per_night: Money,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Response of `POST /api/search/hotels`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotelSearchResponse {
    #[serde(default)]
    pub options: Vec<HotelOption>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/search/poi`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiSearchRequest {
    pub location: GeoLocation,
    pub paging: Paging,
}

/// A point of interest, destination or place suggestion
///
/// The search endpoints return loosely shaped items; the fields the
/// client uses are typed, everything else stays in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaceItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Item list returned by the POI, destination and place endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaceItem>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/agent/plan`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPlanRequest {
    pub user_text: Option<String>,
    /// Partial planner state carried over from the previous turn
    #[serde(default)]
    pub state: serde_json::Map<String, serde_json::Value>,
}

/// Response of `POST /api/agent/plan`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlanResponse {
    pub need_info: bool,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub state: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub itinerary: Option<serde_json::Value>,
    #[serde(default)]
    pub hotel_options: Vec<serde_json::Value>,
}

/// Outcome of an agent planning turn
#[derive(Debug, Clone)]
pub enum AgentPlanOutcome {
    /// The planner needs more information
    NeedsInfo {
        questions: Vec<String>,
        state: serde_json::Map<String, serde_json::Value>,
    },
    /// The planner produced an itinerary
    Planned {
        itinerary: serde_json::Value,
        hotel_options: Vec<serde_json::Value>,
    },
}

impl From<AgentPlanResponse> for AgentPlanOutcome {
    fn from(resp: AgentPlanResponse) -> Self {
        match (resp.need_info, resp.itinerary) {
            (false, Some(itinerary)) => AgentPlanOutcome::Planned {
                itinerary,
                hotel_options: resp.hotel_options,
            },
            _ => AgentPlanOutcome::NeedsInfo {
                questions: resp.questions,
                state: resp.state,
            },
        }
    }
}
