// Module: http
// HTTP/JSON REST API plus the WebSocket push endpoints

pub mod analytics;
pub mod chat;
pub mod error;
pub mod keys;
pub mod notifications;
pub mod reactions;
pub mod registry;
pub mod token;
pub mod vod;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use livecast_core::service::{
    AnalyticsEngine, ChatEngine, NotificationFabric, ReactionEngine, StreamKeyService,
    StreamRegistry, TokenService, VodCoordinator,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub keys: Arc<StreamKeyService>,
    pub chat: Arc<ChatEngine>,
    pub reactions: Arc<ReactionEngine>,
    pub vod: Arc<VodCoordinator>,
    pub analytics: Arc<AnalyticsEngine>,
    pub notifications: Arc<NotificationFabric>,
    pub registry: Arc<StreamRegistry>,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/healthz", get(health_check))

        // Token issuance
        .route(
            "/api/streaming/token",
            get(token::issue_token_query).post(token::issue_token),
        )

        // Stream key management
        .route("/api/streaming/keys/generate", post(keys::generate))
        .route("/api/streaming/keys/validate", post(keys::validate))
        .route("/api/streaming/keys/revoke", post(keys::revoke))
        .route("/api/streaming/keys/delete", post(keys::delete))
        .route("/api/streaming/keys/list", get(keys::list))
        .route("/api/streaming/keys/active", get(keys::active_count))

        // Chat
        .route("/api/streaming/chat/create", post(chat::create_room))
        .route("/api/streaming/chat/join", post(chat::join_room))
        .route("/api/streaming/chat/leave", post(chat::leave_room))
        .route("/api/streaming/chat/send", post(chat::send_message))
        .route("/api/streaming/chat/messages", get(chat::get_messages))
        .route("/api/streaming/chat/delete", post(chat::delete_message))
        .route("/api/streaming/chat/mute", post(chat::mute_participant))
        .route("/api/streaming/chat/ban", post(chat::ban_participant))
        .route("/api/streaming/chat/ws", get(websocket::chat_ws))

        // Reactions
        .route("/api/streaming/reactions/send", post(reactions::send))
        .route("/api/streaming/reactions/stats", get(reactions::stats))
        .route("/api/streaming/reactions/recent", get(reactions::recent))
        .route("/api/streaming/reactions/top", get(reactions::top))
        .route("/api/streaming/reactions/ws", get(websocket::reactions_ws))

        // VOD
        .route("/api/streaming/vod/start", post(vod::start_recording))
        .route("/api/streaming/vod/stop", post(vod::stop_recording))
        .route("/api/streaming/vod/publish", post(vod::publish_recording))
        .route("/api/streaming/vod/list", get(vod::list_recordings))
        .route("/api/streaming/vod/get", get(vod::get_recording))
        .route("/api/streaming/vod/play", post(vod::start_playback))
        .route("/api/streaming/vod/heartbeat", post(vod::playback_heartbeat))
        .route("/api/streaming/vod/end", post(vod::end_playback))

        // Analytics
        .route("/api/streaming/analytics/start", post(analytics::start))
        .route("/api/streaming/analytics/stop", post(analytics::stop))
        .route("/api/streaming/analytics/stream", get(analytics::stream))
        .route("/api/streaming/analytics/sessions", get(analytics::sessions))
        .route("/api/streaming/analytics/join", post(analytics::viewer_join))
        .route("/api/streaming/analytics/leave", post(analytics::viewer_leave))
        .route("/api/streaming/analytics/bitrate", post(analytics::bitrate))

        // Notifications
        .route("/api/streaming/notifications/subscribe", post(notifications::subscribe))
        .route("/api/streaming/notifications/unsubscribe", post(notifications::unsubscribe))
        .route("/api/streaming/notifications/list", get(notifications::list))
        .route("/api/streaming/notifications/read", post(notifications::mark_read))
        .route("/api/streaming/notifications/read_all", post(notifications::mark_all_read))
        .route("/api/streaming/notifications/unread_count", get(notifications::unread_count))
        .route("/api/streaming/notifications/subscriptions", get(notifications::subscriptions))
        .route("/api/streaming/notifications/followers", get(notifications::followers))
        .route("/api/streaming/notifications/ws", get(websocket::notifications_ws))

        // Stream registry
        .route("/api/streaming/list", get(registry::list_streams))
        .route("/api/streaming/register", post(registry::register_stream))
        .route("/api/streaming/unregister", post(registry::unregister_stream))

        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
