//! Analytics endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppResult, AppState};
use livecast_core::models::{Identity, RoomId, StreamAnalytics, ViewerSession};

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub room_name: String,
    pub streamer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomRequest {
    pub room_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub room_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerJoinRequest {
    pub room_name: String,
    pub viewer_id: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerLeaveRequest {
    pub room_name: String,
    pub viewer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BitrateRequest {
    pub room_name: String,
    pub bitrate: u32,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> AppResult<Json<StreamAnalytics>> {
    let analytics = state
        .analytics
        .start(RoomId::from(req.room_name), Identity::from(req.streamer_id))?;
    Ok(Json(analytics))
}

pub async fn stop(
    State(state): State<AppState>,
    Json(req): Json<RoomRequest>,
) -> AppResult<Json<StreamAnalytics>> {
    Ok(Json(state.analytics.stop(&RoomId::from(req.room_name))?))
}

pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<Json<StreamAnalytics>> {
    Ok(Json(state.analytics.snapshot(&RoomId::from(query.room_name))?))
}

pub async fn sessions(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<Json<Vec<ViewerSession>>> {
    Ok(Json(
        state.analytics.viewer_sessions(&RoomId::from(query.room_name)),
    ))
}

pub async fn viewer_join(
    State(state): State<AppState>,
    Json(req): Json<ViewerJoinRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.analytics.viewer_join(
        &RoomId::from(req.room_name),
        Identity::from(req.viewer_id),
        req.platform,
        req.device,
        req.country,
        req.region,
    )?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn viewer_leave(
    State(state): State<AppState>,
    Json(req): Json<ViewerLeaveRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .analytics
        .viewer_leave(&RoomId::from(req.room_name), &Identity::from(req.viewer_id))?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn bitrate(
    State(state): State<AppState>,
    Json(req): Json<BitrateRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .analytics
        .bitrate_update(&RoomId::from(req.room_name), req.bitrate)?;
    Ok(Json(SuccessResponse { success: true }))
}
