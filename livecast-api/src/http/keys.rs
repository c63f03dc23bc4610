//! Stream key endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{AppError, AppResult, AppState};
use livecast_core::models::{Identity, RoomId, StreamKey, StreamPermissions};

#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub streamer_id: String,
    pub room_name: String,
    /// Seconds until expiry; absent means no expiry
    pub expires_in: Option<u64>,
    pub permissions: Option<StreamPermissions>,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub key: StreamKey,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub streamer_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActiveCountResponse {
    pub active_streams: usize,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateKeyRequest>,
) -> AppResult<Json<StreamKey>> {
    if req.streamer_id.is_empty() || req.room_name.is_empty() {
        return Err(AppError::bad_request("streamer_id and room_name required"));
    }

    let key = state.keys.generate(
        Identity::from(req.streamer_id),
        RoomId::from(req.room_name),
        req.permissions,
        req.expires_in.map(Duration::from_secs),
    )?;
    Ok(Json(key))
}

/// Validate a key and record the use. Any validation failure surfaces as
/// 401; callers treat the key as a credential, not a resource.
pub async fn validate(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> AppResult<Json<ValidateResponse>> {
    state
        .keys
        .validate(&req.key)
        .map_err(|e| AppError::unauthorized(e.to_string()))?;

    let key = state.keys.mark_used(&req.key)?;

    Ok(Json(ValidateResponse { valid: true, key }))
}

pub async fn revoke(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.keys.revoke(&req.key)?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.keys.delete(&req.key)?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StreamKey>>> {
    if query.streamer_id.is_empty() {
        return Err(AppError::bad_request("streamer_id required"));
    }
    Ok(Json(
        state.keys.list_by_streamer(&Identity::from(query.streamer_id)),
    ))
}

pub async fn active_count(State(state): State<AppState>) -> Json<ActiveCountResponse> {
    Json(ActiveCountResponse {
        active_streams: state.keys.count_active(),
    })
}
