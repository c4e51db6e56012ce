// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway API tests over the full router, with a mocked transcription
//! provider.

use std::sync::Arc;

use atendo_core::{ContactSummary, Conversation, InstanceSummary, Message};
use atendo_gateway::{
    AuthConfig, GatewayState, Transcriber, TranscriberConfig, build_router,
};
use atendo_storage::queries::conversations::insert_conversation;
use atendo_storage::queries::directory::{insert_agent, insert_contact, insert_instance};
use atendo_storage::queries::messages::insert_message;
use atendo_storage::Database;
use atendo_sync::{AssignmentService, ChangeFeed, ConversationQueryService};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-bearer-token";

async fn seed(db: &Database) {
    insert_contact(
        db,
        &ContactSummary {
            id: "contact-1".into(),
            name: "Maria Silva".into(),
            phone_number: "+5511999990001".into(),
            avatar_url: None,
        },
    )
    .await
    .unwrap();
    insert_instance(
        db,
        &InstanceSummary {
            id: "inst-1".into(),
            name: "main-line".into(),
            status: Some("connected".into()),
        },
    )
    .await
    .unwrap();
    insert_agent(
        db,
        &atendo_core::AgentSummary {
            id: "agent-1".into(),
            full_name: "Ana Souza".into(),
            avatar_url: None,
            presence: Some("online".into()),
        },
    )
    .await
    .unwrap();
    insert_conversation(
        db,
        &Conversation {
            id: "conv-1".into(),
            contact_id: "contact-1".into(),
            instance_id: "inst-1".into(),
            assigned_to: None,
            status: Some("active".into()),
            last_message_at: Some("2026-02-01T10:00:00.000Z".into()),
            last_message_preview: Some("olá".into()),
            unread_count: 1,
            created_at: "2026-02-01T09:00:00.000Z".into(),
            contact: None,
            instance: None,
            assigned_agent: None,
        },
    )
    .await
    .unwrap();
}

async fn build(
    transcriber_api_url: &str,
) -> (Router, Arc<Database>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("gateway.db");
    let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
    seed(&db).await;

    let feed = ChangeFeed::default();
    let state = GatewayState {
        query: Arc::new(ConversationQueryService::new(Arc::clone(&db))),
        assignment: Arc::new(AssignmentService::new(Arc::clone(&db), feed.clone())),
        db: Arc::clone(&db),
        transcriber: Arc::new(Transcriber::new(
            Arc::clone(&db),
            feed,
            TranscriberConfig {
                api_url: transcriber_api_url.to_string(),
                api_key: Some("upstream-key".to_string()),
                model: "google/gemini-2.5-flash".to_string(),
                prompt: "Transcreva este áudio em português.".to_string(),
                max_tokens: 1000,
            },
        )),
        auth: AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
        start_time: std::time::Instant::now(),
    };
    (build_router(state), db, dir)
}

async fn call(
    router: &Router,
    method_str: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method_str).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_is_public_but_api_requires_auth() {
    let (router, _db, _dir) = build("http://127.0.0.1:9/unused").await;

    let (status, body) = call(&router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&router, "GET", "/v1/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&router, "GET", "/v1/conversations", Some("wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_listing_returns_page_with_stats() {
    let (router, _db, _dir) = build("http://127.0.0.1:9/unused").await;

    let (status, body) = call(&router, "GET", "/v1/conversations", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversations"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["stats"]["unassigned"], 1);
    assert_eq!(body["conversations"][0]["contact"]["name"], "Maria Silva");

    let (status, body) = call(
        &router,
        "GET",
        "/v1/conversations?search=zzz",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total"], 0);
}

#[tokio::test]
async fn assign_writes_audit_and_updates_listing() {
    let (router, _db, _dir) = build("http://127.0.0.1:9/unused").await;

    let (status, body) = call(
        &router,
        "POST",
        "/v1/conversations/conv-1/assign",
        Some(TOKEN),
        Some(json!({"assigned_to": "agent-1", "reason": "transfer"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_to"], "agent-1");

    let (status, body) = call(
        &router,
        "GET",
        "/v1/conversations/conv-1/assignments",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
    assert_eq!(body["events"][0]["reason"], "transfer");

    let (status, body) = call(
        &router,
        "GET",
        "/v1/conversations?agent_id=agent-1",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversations"][0]["assigned_agent"]["full_name"], "Ana Souza");

    let (status, _) = call(
        &router,
        "POST",
        "/v1/conversations/no-such/assign",
        Some(TOKEN),
        Some(json!({"assigned_to": "agent-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transcribe_calls_provider_once_and_caches_result() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/voice-1.ogg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-ogg-bytes".to_vec()))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "  oi, tudo bem?  "}}]
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let (router, db, _dir) = build(&format!("{}/v1/chat/completions", provider.uri())).await;
    insert_message(
        &db,
        &Message {
            id: "voice-1".into(),
            conversation_id: "conv-1".into(),
            direction: "inbound".into(),
            content: None,
            media_url: Some(format!("{}/media/voice-1.ogg", provider.uri())),
            media_mimetype: Some("audio/ogg".into()),
            audio_transcription: None,
            transcription_status: None,
            created_at: "2026-02-01T10:05:00.000Z".into(),
        },
    )
    .await
    .unwrap();

    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/voice-1/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["transcription"], "oi, tudo bem?");

    // Second request serves the stored transcript; the expect(1) mocks
    // verify no duplicate provider traffic.
    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/voice-1/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["transcription"], "oi, tudo bem?");
}

#[tokio::test]
async fn failed_transcription_is_terminal_conflict() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/voice-2.ogg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-ogg-bytes".to_vec()))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&provider)
        .await;

    let (router, db, _dir) = build(&format!("{}/v1/chat/completions", provider.uri())).await;
    insert_message(
        &db,
        &Message {
            id: "voice-2".into(),
            conversation_id: "conv-1".into(),
            direction: "inbound".into(),
            content: None,
            media_url: Some(format!("{}/media/voice-2.ogg", provider.uri())),
            media_mimetype: Some("audio/ogg".into()),
            audio_transcription: None,
            transcription_status: None,
            created_at: "2026-02-01T10:05:00.000Z".into(),
        },
    )
    .await
    .unwrap();

    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/voice-2/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("429"));

    // Failure sticks: no retry, no further provider calls.
    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/voice-2/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not be retried"));
}

#[tokio::test]
async fn transcribe_in_flight_message_reports_processing_without_provider_call() {
    // Provider URL is unreachable; any upstream attempt would error out.
    let (router, db, _dir) = build("http://127.0.0.1:9/unused").await;
    insert_message(
        &db,
        &Message {
            id: "voice-3".into(),
            conversation_id: "conv-1".into(),
            direction: "inbound".into(),
            content: None,
            media_url: Some("http://127.0.0.1:9/media/voice-3.ogg".into()),
            media_mimetype: Some("audio/ogg".into()),
            audio_transcription: None,
            transcription_status: Some("processing".into()),
            created_at: "2026-02-01T10:05:00.000Z".into(),
        },
    )
    .await
    .unwrap();

    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/voice-3/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
    assert!(body.get("transcription").is_none());
}

#[tokio::test]
async fn transcribe_unknown_message_is_not_found() {
    let (router, _db, _dir) = build("http://127.0.0.1:9/unused").await;

    let (status, _) = call(
        &router,
        "POST",
        "/v1/messages/no-such/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transcribe_text_message_is_bad_request() {
    let (router, db, _dir) = build("http://127.0.0.1:9/unused").await;
    insert_message(
        &db,
        &Message {
            id: "text-1".into(),
            conversation_id: "conv-1".into(),
            direction: "inbound".into(),
            content: Some("sem áudio".into()),
            media_url: None,
            media_mimetype: None,
            audio_transcription: None,
            transcription_status: None,
            created_at: "2026-02-01T10:05:00.000Z".into(),
        },
    )
    .await
    .unwrap();

    let (status, body) = call(
        &router,
        "POST",
        "/v1/messages/text-1/transcribe",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no audio"));
}

#[tokio::test]
async fn message_listing_is_chronological() {
    let (router, db, _dir) = build("http://127.0.0.1:9/unused").await;
    for (id, ts) in [
        ("m2", "2026-02-01T10:00:02.000Z"),
        ("m1", "2026-02-01T10:00:01.000Z"),
    ] {
        insert_message(
            &db,
            &Message {
                id: id.into(),
                conversation_id: "conv-1".into(),
                direction: "inbound".into(),
                content: Some("olá".into()),
                media_url: None,
                media_mimetype: None,
                audio_transcription: None,
                transcription_status: None,
                created_at: ts.into(),
            },
        )
        .await
        .unwrap();
    }

    let (status, body) = call(
        &router,
        "GET",
        "/v1/conversations/conv-1/messages",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["m1", "m2"]);
}
