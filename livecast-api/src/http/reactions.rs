//! Reaction endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppError, AppResult, AppState};
use livecast_core::models::{
    Identity, Reaction, ReactionPosition, ReactionStats, ReactionType, RoomId, TopReactor,
};

#[derive(Debug, Deserialize)]
pub struct SendReactionRequest {
    pub room_name: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub reaction_type: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub room_name: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TopReactorsResponse {
    pub top_reactors: Vec<TopReactor>,
}

pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendReactionRequest>,
) -> AppResult<Json<Reaction>> {
    let kind = ReactionType::parse(&req.reaction_type)
        .ok_or_else(|| AppError::bad_request(format!("unknown reaction_type: {}", req.reaction_type)))?;

    let position = match (req.x, req.y) {
        (Some(x), Some(y)) => Some(ReactionPosition { x, y }),
        _ => None,
    };

    let room_name = RoomId::from(req.room_name);
    let user_id = Identity::from(req.user_id.clone());
    let user_name = if req.user_name.is_empty() {
        req.user_id
    } else {
        req.user_name
    };

    let reaction = state
        .reactions
        .send(&room_name, user_id.clone(), user_name, kind, position)?;

    // Analytics is best-effort; a stream without an aggregator is fine
    let _ = state.analytics.reaction(&room_name, &user_id, kind);

    Ok(Json(reaction))
}

pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<Json<ReactionStats>> {
    Ok(Json(state.reactions.stats(&RoomId::from(query.room_name))?))
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<Json<Vec<Reaction>>> {
    let reactions = state
        .reactions
        .recent(&RoomId::from(query.room_name), query.limit.unwrap_or(50))?;
    Ok(Json(reactions))
}

pub async fn top(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> AppResult<Json<TopReactorsResponse>> {
    let top_reactors = state
        .reactions
        .top_reactors(&RoomId::from(query.room_name), query.limit.unwrap_or(10))?;
    Ok(Json(TopReactorsResponse { top_reactors }))
}
