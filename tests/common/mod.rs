use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;
use tripplanner::config::{ApiConfig, ChatConfig, RetryConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// API settings pointing at a mock server
#[allow(dead_code)]
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

/// Chat settings without greeting or retry delay
#[allow(dead_code)]
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

/// Newline-delimited stream body
#[allow(dead_code)]
pub fn ndjson(lines: &[&str]) -> Vec<u8> {
    let mut body = lines.join("\n");
    body.push('\n');
    body.into_bytes()
}

/// Stream body with `message` chunks followed by `done`
#[allow(dead_code)]
pub fn reply_body(chunks: &[&str]) -> Vec<u8> {
    let mut lines: Vec<String> = chunks
        .iter()
        .map(|c| json!({"event": "message", "role": "assistant", "content": c}).to_string())
        .collect();
    lines.push(json!({"event": "done"}).to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    ndjson(&refs)
}

/// Mount the message endpoint and a stream endpoint answering `chunks`
#[allow(dead_code)]
pub async fn mount_chat(server: &MockServer, conversation_id: &str, chunks: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": conversation_id,
            "message_id": "m-1",
            "stream_url": "/api/chat/stream/m-1",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/chat/stream/m-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(reply_body(chunks), "application/x-ndjson"),
        )
        .mount(server)
        .await;
}

/// Two-day Kyoto trip plan as the backend sends it
#[allow(dead_code)]
pub fn kyoto_plan() -> Value {
    json!({
        "trip_plan": [
            {"day": 1, "locations": [
                {"name": "Fushimi Inari Taisha", "lat": 34.9671, "lng": 135.7727}
            ]},
            {"day": 2, "locations": [
                {"name": "Arashiyama Bamboo Grove", "lat": 35.0170, "lng": 135.6713},
                {"name": "Somewhere unmapped"}
            ]}
        ],
        "stay_plan": [
            {"name": "Hotel Kanra Kyoto", "coordinates": {"lat": 34.9925, "lng": 135.7578}}
        ]
    })
}

/// Conversation state envelope
#[allow(dead_code)]
pub fn state_body(done: bool, trip_plan: Value) -> Value {
    json!({"state": {"itinerary_done": done, "trip_plan": trip_plan}})
}

/// Request bodies sent to `/api/chat/messages`, in order
#[allow(dead_code)]
pub async fn sent_messages(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/chat/messages")
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}
