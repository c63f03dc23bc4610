//! VOD endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppError, AppResult, AppState};
use livecast_core::models::{Identity, PlaybackSession, RoomId, VodRecording};

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    pub room_name: String,
    pub streamer_id: String,
    #[serde(default)]
    pub streamer_name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub success: bool,
    pub recording_id: String,
    pub egress_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StopRecordingRequest {
    pub recording_id: String,
    /// Must name the job bound to the recording when supplied
    #[serde(default)]
    pub egress_id: Option<String>,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub file_size: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordingIdRequest {
    pub recording_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub streamer_id: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    pub recording_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub recording_id: String,
    pub user_id: String,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub session_id: String,
    pub position_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct EndPlaybackRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> AppResult<Json<StartRecordingResponse>> {
    if req.room_name.is_empty() || req.streamer_id.is_empty() {
        return Err(AppError::bad_request("room_name and streamer_id required"));
    }

    let (recording, egress_id) = state
        .vod
        .start(
            RoomId::from(req.room_name),
            Identity::from(req.streamer_id),
            req.streamer_name,
            req.title,
        )
        .await?;

    Ok(Json(StartRecordingResponse {
        success: true,
        recording_id: recording.id,
        egress_id,
        status: recording.status.as_str().to_string(),
    }))
}

pub async fn stop_recording(
    State(state): State<AppState>,
    Json(req): Json<StopRecordingRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if req.recording_id.is_empty() {
        return Err(AppError::bad_request("recording_id required"));
    }

    state.vod.stop(
        &req.recording_id,
        req.egress_id.as_deref(),
        req.duration_secs,
        req.file_size,
    )?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn publish_recording(
    State(state): State<AppState>,
    Json(req): Json<RecordingIdRequest>,
) -> AppResult<Json<VodRecording>> {
    Ok(Json(state.vod.publish(&req.recording_id)?))
}

pub async fn list_recordings(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<VodRecording>>> {
    let limit = query.limit.unwrap_or(50).min(100);
    let offset = query.offset.unwrap_or(0);

    let recordings = if query.streamer_id.is_empty() || query.streamer_id == "ALL" {
        state.vod.list_all(limit, offset)
    } else {
        state
            .vod
            .list_by_streamer(&Identity::from(query.streamer_id), limit, offset)
    };
    Ok(Json(recordings))
}

pub async fn get_recording(
    State(state): State<AppState>,
    Query(query): Query<GetQuery>,
) -> AppResult<Json<VodRecording>> {
    Ok(Json(state.vod.get(&query.recording_id)?))
}

pub async fn start_playback(
    State(state): State<AppState>,
    Json(req): Json<PlayRequest>,
) -> AppResult<Json<PlaybackSession>> {
    let session = state.vod.start_playback(
        &req.recording_id,
        Identity::from(req.user_id),
        req.quality.unwrap_or_else(|| "auto".to_string()),
    )?;
    Ok(Json(session))
}

pub async fn playback_heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> AppResult<Json<PlaybackSession>> {
    Ok(Json(state.vod.heartbeat(&req.session_id, req.position_secs)?))
}

pub async fn end_playback(
    State(state): State<AppState>,
    Json(req): Json<EndPlaybackRequest>,
) -> AppResult<Json<PlaybackSession>> {
    Ok(Json(state.vod.end_playback(&req.session_id)?))
}
