//! Token issuance endpoint
//!
//! Issues short-lived room-join grants. POST takes a JSON body; GET takes
//! the same fields as query parameters for simple embed flows.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppResult, AppState};
use livecast_core::models::{Identity, RoomId};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub room_name: String,
    pub identity: String,
    #[serde(default)]
    pub is_publisher: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub is_publisher: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    issue(&state, &req.room_name, &req.identity, req.is_publisher)
}

pub async fn issue_token_query(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<TokenResponse>> {
    let is_publisher = query.is_publisher.as_deref() == Some("true");
    issue(&state, &query.room_name, &query.identity, is_publisher)
}

fn issue(
    state: &AppState,
    room_name: &str,
    identity: &str,
    is_publisher: bool,
) -> AppResult<Json<TokenResponse>> {
    let issued = state.tokens.issue(
        &RoomId::from(room_name),
        &Identity::from(identity),
        is_publisher,
    )?;

    Ok(Json(TokenResponse {
        token: issued.token,
        url: issued.url,
    }))
}
