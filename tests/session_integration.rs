//! End-to-end session tests over HTTP
//!
//! A `ChatSession` backed by the real `ApiClient` talks to a `wiremock`
//! server: the reply streams into the transcript, the itinerary is polled
//! once the stream is done, and empty plans trigger reformulated retries.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripplanner::session::{ChatSession, MemoryStore, PollDecision, Sender, SledStore};
use tripplanner::ApiClient;

mod common;

fn session(server: &MockServer) -> ChatSession {
    let client = Arc::new(ApiClient::new(&common::api_config(server)).expect("client"));
    ChatSession::new(client, &common::fast_chat_config(), Box::new(MemoryStore::new()))
}

async fn mount_state(server: &MockServer, conversation_id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/chat/conversations/{}/state", conversation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_kyoto_trip_streams_and_maps_itinerary() {
    let server = MockServer::start().await;
    common::mount_chat(&server, "conv-kyoto", &["Sure", ", here's", " your plan"]).await;
    mount_state(
        &server,
        "conv-kyoto",
        common::state_body(true, common::kyoto_plan()),
    )
    .await;

    let mut session = session(&server);
    session.store_mut().set_conversation_id(Some("conv-kyoto"));
    let report = session.submit("Plan a 3-day trip to Kyoto").await.unwrap();

    let messages = session.store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[1].text, "Sure, here's your plan");
    assert!(!session.store().is_typing());

    assert_eq!(report.retries(), 0);
    assert!(matches!(
        report.final_decision(),
        Some(PollDecision::Resolved { .. })
    ));
    let titles: Vec<_> = session.markers().iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Fushimi Inari Taisha", "Arashiyama Bamboo Grove"]);
    assert!(session.store().itinerary().is_done);

    let sent = common::sent_messages(&server).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["conversation_id"], "conv-kyoto");
}

#[tokio::test]
async fn test_empty_plan_retries_with_reformulated_prompt() {
    let server = MockServer::start().await;
    common::mount_chat(&server, "conv-retry", &["Working on it"]).await;

    // First poll: done but no days. Afterwards: a populated plan.
    Mock::given(method("GET"))
        .and(path("/api/chat/conversations/conv-retry/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::state_body(true, json!({"trip_plan": []}))),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_state(
        &server,
        "conv-retry",
        common::state_body(true, common::kyoto_plan()),
    )
    .await;

    let mut session = session(&server);
    session.store_mut().set_conversation_id(Some("conv-retry"));
    let report = session.submit("Plan a trip to Kyoto").await.unwrap();

    assert_eq!(report.retries(), 1);
    assert_eq!(session.markers().len(), 2);

    let sent = common::sent_messages(&server).await;
    assert_eq!(sent.len(), 2);
    let retry_prompt = sent[1]["content"].as_str().unwrap();
    assert!(retry_prompt.contains("Kyoto"));
    assert_ne!(retry_prompt, "Plan a trip to Kyoto");

    // The retry is not echoed as a user message.
    let user_messages = session
        .store()
        .messages()
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    assert_eq!(user_messages, 1);
}

#[tokio::test]
async fn test_retry_reply_repeating_previous_reply_gets_its_own_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "conv-echo",
            "message_id": "m-1",
            "stream_url": "/api/chat/stream/m-1",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/stream/m-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            common::reply_body(&["Let me check"]),
            "application/x-ndjson",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/stream/m-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            common::reply_body(&["Let me check", " - day 1: Fushimi Inari"]),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/conversations/conv-echo/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::state_body(true, json!({"trip_plan": []}))),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_state(
        &server,
        "conv-echo",
        common::state_body(true, common::kyoto_plan()),
    )
    .await;

    let mut session = session(&server);
    session.store_mut().set_conversation_id(Some("conv-echo"));
    let report = session.submit("Plan a trip to Kyoto").await.unwrap();

    assert_eq!(report.retries(), 1);
    let transcript: Vec<_> = session
        .store()
        .messages()
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Sender::User, "Plan a trip to Kyoto"),
            (Sender::Assistant, "Let me check"),
            (Sender::Assistant, "Let me check - day 1: Fushimi Inari"),
        ]
    );
}

#[tokio::test]
async fn test_persistently_empty_plan_gives_up_after_three_retries() {
    let server = MockServer::start().await;
    common::mount_chat(&server, "conv-empty", &["Hmm"]).await;
    mount_state(
        &server,
        "conv-empty",
        common::state_body(true, json!({"trip_plan": []})),
    )
    .await;

    let mut session = session(&server);
    session.store_mut().set_conversation_id(Some("conv-empty"));
    let report = session.submit("Plan a 3-day trip to Kyoto").await.unwrap();

    assert_eq!(report.retries(), 3);
    assert_eq!(common::sent_messages(&server).await.len(), 4);
    match report.final_decision() {
        Some(PollDecision::GaveUp { message }) => assert!(message.contains("Kyoto")),
        other => panic!("expected give-up, got {:?}", other),
    }
    assert_eq!(
        session.store().last_message().unwrap().text,
        tripplanner::session::poller::gave_up_message("Kyoto")
    );
    assert!(session.markers().is_empty());
}

#[tokio::test]
async fn test_backend_failure_shows_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut session = session(&server);
    let report = session.submit("hello").await.unwrap();

    assert!(report.dispatches[0].failed);
    assert!(report.decisions.is_empty());
    assert_eq!(
        session.store().last_message().unwrap().text,
        "Sorry, something went wrong."
    );
    assert!(!session.store().is_typing());
}

#[tokio::test]
async fn test_conversation_id_survives_restart() {
    let server = MockServer::start().await;
    common::mount_chat(&server, "ignored", &["ok"]).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": {}})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = Arc::new(ApiClient::new(&common::api_config(&server)).unwrap());

    let first_id = {
        let store = SledStore::open(dir.path().join("ids")).unwrap();
        let mut session =
            ChatSession::new(client.clone(), &common::fast_chat_config(), Box::new(store));
        let report = session.submit("hi").await.unwrap();
        report.dispatches[0].conversation_id.clone()
    };

    let store = SledStore::open(dir.path().join("ids")).unwrap();
    let session = ChatSession::new(client, &common::fast_chat_config(), Box::new(store));
    assert_eq!(session.store().conversation_id(), Some(first_id.as_str()));
}
