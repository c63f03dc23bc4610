//! Stream registry endpoints (the discovery page)

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::{AppError, AppResult, AppState};
use livecast_core::models::StreamRegistryEntry;

#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn list_streams(State(state): State<AppState>) -> Json<Vec<StreamRegistryEntry>> {
    Json(state.registry.list())
}

pub async fn register_stream(
    State(state): State<AppState>,
    Json(entry): Json<StreamRegistryEntry>,
) -> AppResult<Json<StatusResponse>> {
    if entry.id.is_empty() {
        return Err(AppError::bad_request("Missing stream ID"));
    }
    state.registry.register(entry);
    Ok(Json(StatusResponse {
        status: "registered",
    }))
}

pub async fn unregister_stream(
    State(state): State<AppState>,
    Json(req): Json<UnregisterRequest>,
) -> Json<StatusResponse> {
    state.registry.unregister(&req.id);
    Json(StatusResponse {
        status: "unregistered",
    })
}
