//! Notification and follower endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppResult, AppState};
use livecast_core::models::{Identity, Notification, Subscription, SubscriptionPrefs};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub user_id: String,
    pub streamer_id: String,
    #[serde(default)]
    pub streamer_name: String,
    #[serde(default)]
    pub preferences: Option<SubscriptionPrefs>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub user_id: String,
    pub streamer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
    #[serde(default)]
    pub unread_only: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamerQuery {
    pub streamer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: String,
    pub notification_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FollowersResponse {
    pub follower_count: usize,
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<Json<Subscription>> {
    let subscription = state.notifications.subscribe(
        Identity::from(req.user_id),
        Identity::from(req.streamer_id),
        req.streamer_name,
        req.preferences,
    )?;
    Ok(Json(subscription))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .notifications
        .unsubscribe(&Identity::from(req.user_id), &Identity::from(req.streamer_id))?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Notification>> {
    Json(state.notifications.list(
        &Identity::from(query.user_id),
        query.unread_only.unwrap_or(false),
        query.limit.unwrap_or(50),
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .notifications
        .mark_read(&Identity::from(req.user_id), &req.notification_id)?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Json(req): Json<UserQuery>,
) -> Json<SuccessResponse> {
    state.notifications.mark_all_read(&Identity::from(req.user_id));
    Json(SuccessResponse { success: true })
}

pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Json<UnreadCountResponse> {
    Json(UnreadCountResponse {
        unread_count: state.notifications.unread_count(&Identity::from(query.user_id)),
    })
}

pub async fn subscriptions(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Json<Vec<Subscription>> {
    Json(state.notifications.subscriptions(&Identity::from(query.user_id)))
}

pub async fn followers(
    State(state): State<AppState>,
    Query(query): Query<StreamerQuery>,
) -> Json<FollowersResponse> {
    Json(FollowersResponse {
        follower_count: state
            .notifications
            .follower_count(&Identity::from(query.streamer_id)),
    })
}
