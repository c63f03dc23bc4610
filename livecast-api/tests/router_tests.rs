//! Router-level tests: request in, status and JSON body out.
//!
//! Run with: cargo test -p livecast-api

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use livecast_api::{create_router, AppState};
use livecast_core::config::{
    AnalyticsConfig, NotificationConfig, ReactionConfig, VodConfig,
};
use livecast_core::models::RoomId;
use livecast_core::service::{
    AnalyticsEngine, ChatEngine, ContentFilter, EgressClient, EgressInfo, FileOutput,
    NotificationFabric, ReactionEngine, StreamKeyService, StreamRegistry, TokenService,
    VodCoordinator,
};

struct NullEgress;

#[async_trait]
impl EgressClient for NullEgress {
    async fn start_room_composite(
        &self,
        room_name: &RoomId,
        _layout: &str,
        _outputs: &[FileOutput],
    ) -> livecast_core::Result<EgressInfo> {
        Ok(EgressInfo {
            egress_id: format!("eg-{room_name}"),
        })
    }

    async fn stop(&self, _egress_id: &str) -> livecast_core::Result<()> {
        Ok(())
    }
}

fn test_state() -> AppState {
    let vod_config = VodConfig {
        processing_delay_secs: 0,
        ..VodConfig::default()
    };

    AppState {
        tokens: Arc::new(TokenService::new(
            "devkey".to_string(),
            "secret".to_string(),
            "ws://localhost:7880".to_string(),
            Duration::from_secs(24 * 3600),
        )),
        keys: Arc::new(StreamKeyService::new()),
        chat: Arc::new(ChatEngine::new(ContentFilter::new(), 64)),
        reactions: Arc::new(ReactionEngine::new(ReactionConfig::default())),
        vod: Arc::new(VodCoordinator::new(Arc::new(NullEgress), None, vod_config)),
        analytics: Arc::new(AnalyticsEngine::new(AnalyticsConfig::default())),
        notifications: Arc::new(NotificationFabric::new(NotificationConfig::default())),
        registry: Arc::new(StreamRegistry::new()),
    }
}

async fn request(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let router = create_router(state.clone());
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_token_endpoint_issues_publisher_grant() {
    let state = test_state();
    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/token",
        Some(json!({"room_name": "r1", "identity": "alice", "is_publisher": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["url"], "ws://localhost:7880");

    // The grant decodes back to the requested capabilities
    let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
    assert!(claims.video.can_publish);
    assert!(claims.video.can_subscribe);
}

#[tokio::test]
async fn test_token_endpoint_requires_fields() {
    let state = test_state();
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/token",
        Some(json!({"room_name": "", "identity": "", "is_publisher": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_key_lifecycle() {
    let state = test_state();

    let (status, key_body) = request(
        &state,
        "POST",
        "/api/streaming/keys/generate",
        Some(json!({"streamer_id": "alice", "room_name": "r1", "expires_in": 3600})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let key = key_body["key"].as_str().unwrap().to_string();
    assert_eq!(key.len(), 64);

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/keys/validate",
        Some(json!({"key": key})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["key"]["usage_count"], 1);

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/keys/revoke",
        Some(json!({"key": key})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Revoked keys validate as 401, not 404
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/keys/validate",
        Some(json!({"key": key})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_create_is_idempotent() {
    let state = test_state();

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/chat/create",
        Some(json!({"room_name": "r1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/chat/create",
        Some(json!({"room_name": "r1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_chat_send_and_paginate() {
    let state = test_state();
    request(
        &state,
        "POST",
        "/api/streaming/chat/create",
        Some(json!({"room_name": "r1"})),
    )
    .await;

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/chat/send",
        Some(json!({
            "room_name": "r1",
            "sender_id": "bob",
            "content": "hello",
            "message_type": "text"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "hello");
    assert_eq!(body["is_deleted"], false);

    let (status, body) = request(&state, "GET", "/api/streaming/chat/messages?room_name=r1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = request(
        &state,
        "GET",
        "/api/streaming/chat/messages?room_name=missing",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_moderation_requires_moderator() {
    let state = test_state();
    request(
        &state,
        "POST",
        "/api/streaming/chat/create",
        Some(json!({"room_name": "r1"})),
    )
    .await;
    request(
        &state,
        "POST",
        "/api/streaming/chat/send",
        Some(json!({"room_name": "r1", "sender_id": "bob", "content": "hi"})),
    )
    .await;

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/chat/mute",
        Some(json!({
            "room_name": "r1",
            "participant_id": "bob",
            "moderator_id": "eve",
            "duration_secs": 60
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_moderator_join_enables_moderation() {
    let state = test_state();
    request(
        &state,
        "POST",
        "/api/streaming/chat/create",
        Some(json!({"room_name": "r1"})),
    )
    .await;

    // A moderator join populates the moderator set
    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/chat/join",
        Some(json!({
            "room_name": "r1",
            "participant_id": "mod",
            "participant_name": "Mod",
            "is_moderator": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_type"], "join_leave");

    request(
        &state,
        "POST",
        "/api/streaming/chat/send",
        Some(json!({"room_name": "r1", "sender_id": "bob", "content": "hi"})),
    )
    .await;

    // The moderator can now mute...
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/chat/mute",
        Some(json!({
            "room_name": "r1",
            "participant_id": "bob",
            "moderator_id": "mod",
            "duration_secs": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // ...and the muted participant is rejected
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/chat/send",
        Some(json!({"room_name": "r1", "sender_id": "bob", "content": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Leaving drops the participant
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/chat/leave",
        Some(json!({"room_name": "r1", "participant_id": "mod"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reaction_burst_hits_per_second_limit() {
    let state = test_state();

    let mut ok = 0;
    let mut limited = 0;
    for _ in 0..4 {
        let (status, _) = request(
            &state,
            "POST",
            "/api/streaming/reactions/send",
            Some(json!({
                "room_name": "r1",
                "user_id": "alice",
                "user_name": "Alice",
                "reaction_type": "fire"
            })),
        )
        .await;
        match status {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 3);
    assert_eq!(limited, 1);

    let (status, body) = request(&state, "GET", "/api/streaming/reactions/stats?room_name=r1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_reactions"], 3);
}

#[tokio::test]
async fn test_reaction_rejects_unknown_type() {
    let state = test_state();
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/reactions/send",
        Some(json!({
            "room_name": "r1",
            "user_id": "alice",
            "reaction_type": "thumbsdown"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vod_start_stop_reconciliation() {
    let state = test_state();

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/vod/start",
        Some(json!({
            "room_name": "r1",
            "streamer_id": "alice",
            "streamer_name": "Alice",
            "title": "My stream"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "recording");
    let recording_id = body["recording_id"].as_str().unwrap().to_string();
    let egress_id = body["egress_id"].as_str().unwrap().to_string();
    assert!(!egress_id.is_empty());

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/vod/stop",
        Some(json!({"recording_id": recording_id, "egress_id": egress_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Post-processing runs on a background task with no delay configured
    let mut recording = Value::Null;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let (_, body) = request(
            &state,
            "GET",
            &format!("/api/streaming/vod/get?recording_id={recording_id}"),
            None,
        )
        .await;
        if body["status"] == "ready" {
            recording = body;
            break;
        }
    }
    assert_eq!(recording["status"], "ready");
    assert!(!recording["video_url"].as_str().unwrap().is_empty());
    assert!(!recording["thumbnail_url"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_vod_stop_rejects_wrong_egress_id() {
    let state = test_state();

    let (_, body) = request(
        &state,
        "POST",
        "/api/streaming/vod/start",
        Some(json!({
            "room_name": "r1",
            "streamer_id": "alice",
            "streamer_name": "Alice",
            "title": "t"
        })),
    )
    .await;
    let recording_id = body["recording_id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/vod/stop",
        Some(json!({"recording_id": recording_id, "egress_id": "eg-wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The recording is still stoppable with the right id
    let (_, body) = request(
        &state,
        "GET",
        &format!("/api/streaming/vod/get?recording_id={recording_id}"),
        None,
    )
    .await;
    assert_eq!(body["status"], "recording");
}

#[tokio::test]
async fn test_analytics_unique_count_scenario() {
    let state = test_state();
    request(
        &state,
        "POST",
        "/api/streaming/analytics/start",
        Some(json!({"room_name": "r3", "streamer_id": "streamer"})),
    )
    .await;

    for viewer in ["alice", "bob", "alice"] {
        request(
            &state,
            "POST",
            "/api/streaming/analytics/join",
            Some(json!({"room_name": "r3", "viewer_id": viewer})),
        )
        .await;
    }
    request(
        &state,
        "POST",
        "/api/streaming/analytics/leave",
        Some(json!({"room_name": "r3", "viewer_id": "alice"})),
    )
    .await;
    request(
        &state,
        "POST",
        "/api/streaming/analytics/join",
        Some(json!({"room_name": "r3", "viewer_id": "alice"})),
    )
    .await;

    let (status, body) = request(&state, "GET", "/api/streaming/analytics/stream?room_name=r3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_viewers"], 4);
    assert_eq!(body["unique_viewers"], 2);
    assert_eq!(body["current_viewers"], 2);
    assert_eq!(body["peak_viewers"], 2);
}

#[tokio::test]
async fn test_registry_round_trip() {
    let state = test_state();

    let (status, body) = request(
        &state,
        "POST",
        "/api/streaming/register",
        Some(json!({
            "id": "s1",
            "title": "Live now",
            "streamer": "alice",
            "avatar": "",
            "viewers": 3,
            "startTime": 1700000000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "registered");

    let (_, body) = request(&state, "GET", "/api/streaming/list", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["startTime"], 1700000000);

    let (_, body) = request(
        &state,
        "POST",
        "/api/streaming/unregister",
        Some(json!({"id": "s1"})),
    )
    .await;
    assert_eq!(body["status"], "unregistered");

    let (_, body) = request(&state, "GET", "/api/streaming/list", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_rejects_missing_id() {
    let state = test_state();
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/register",
        Some(json!({"id": "", "title": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notifications_flow() {
    let state = test_state();

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/notifications/subscribe",
        Some(json!({"user_id": "fan", "streamer_id": "alice", "streamer_name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate subscription conflicts
    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/notifications/subscribe",
        Some(json!({"user_id": "fan", "streamer_id": "alice", "streamer_name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    state.notifications.notify_stream_started(
        &livecast_core::models::Identity::from("alice"),
        "Alice",
        &RoomId::from("r1"),
        "Big show",
    );

    let (_, body) = request(
        &state,
        "GET",
        "/api/streaming/notifications/unread_count?user_id=fan",
        None,
    )
    .await;
    assert_eq!(body["unread_count"], 1);

    let (_, body) = request(
        &state,
        "GET",
        "/api/streaming/notifications/list?user_id=fan",
        None,
    )
    .await;
    let notification_id = body[0]["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &state,
        "POST",
        "/api/streaming/notifications/read",
        Some(json!({"user_id": "fan", "notification_id": notification_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(
        &state,
        "GET",
        "/api/streaming/notifications/unread_count?user_id=fan",
        None,
    )
    .await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn test_healthz() {
    let state = test_state();
    let router = create_router(state);
    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
