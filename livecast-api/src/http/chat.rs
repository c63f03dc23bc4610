//! Chat endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{AppError, AppResult, AppState};
use livecast_core::models::{ChatMessage, ChatMessageKind, ChatRoomInfo, Identity, RoomId};
use livecast_core::Error;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub room_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub participant_count: usize,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub room_name: String,
    pub participant_id: String,
    #[serde(default)]
    pub participant_name: Option<String>,
    #[serde(default)]
    pub is_moderator: bool,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRoomRequest {
    pub room_name: String,
    pub participant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub room_name: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub mentioned_users: Vec<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub room_name: String,
    pub limit: Option<usize>,
    /// RFC 3339; only strictly older messages are returned
    pub before: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageRequest {
    pub room_name: String,
    pub message_id: String,
    pub moderator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub room_name: String,
    pub participant_id: String,
    pub moderator_id: String,
    #[serde(default)]
    pub duration_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn parse_message_kind(kind: Option<&str>) -> AppResult<ChatMessageKind> {
    match kind.unwrap_or("text") {
        "text" => Ok(ChatMessageKind::Text),
        "emoji" => Ok(ChatMessageKind::Emoji),
        "system" => Ok(ChatMessageKind::System),
        "gift" => Ok(ChatMessageKind::Gift),
        "join_leave" => Ok(ChatMessageKind::JoinLeave),
        other => Err(AppError::bad_request(format!(
            "unknown message_type: {other}"
        ))),
    }
}

/// Create a chat room. Idempotent at this layer: an existing room returns
/// success rather than 409.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<Json<CreateRoomResponse>> {
    if req.room_name.is_empty() {
        return Err(AppError::bad_request("room_name required"));
    }

    let room_name = RoomId::from(req.room_name.clone());
    match state.chat.create_room(room_name.clone(), None) {
        Ok(info) => Ok(Json(CreateRoomResponse {
            room_name: req.room_name,
            created_at: Some(info.created_at),
            message_count: info.message_count,
            participant_count: info.participant_count,
            success: true,
        })),
        Err(Error::AlreadyExists(_)) => {
            let info: Option<ChatRoomInfo> = state.chat.room_info(&room_name);
            Ok(Json(CreateRoomResponse {
                room_name: req.room_name,
                created_at: info.as_ref().map(|i| i.created_at),
                message_count: info.as_ref().map_or(0, |i| i.message_count),
                participant_count: info.as_ref().map_or(0, |i| i.participant_count),
                success: true,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Join a participant to a room. Moderator joins populate the room's
/// moderator set, which gates mute, ban, and message deletion.
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> AppResult<Json<ChatMessage>> {
    let name = req
        .participant_name
        .unwrap_or_else(|| req.participant_id.clone());
    let message = state.chat.join(
        &RoomId::from(req.room_name),
        Identity::from(req.participant_id),
        name,
        req.is_moderator,
    )?;
    Ok(Json(message))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Json(req): Json<LeaveRoomRequest>,
) -> AppResult<Json<ChatMessage>> {
    let message = state.chat.leave(
        &RoomId::from(req.room_name),
        &Identity::from(req.participant_id),
    )?;
    Ok(Json(message))
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ChatMessage>> {
    let kind = parse_message_kind(req.message_type.as_deref())?;
    let room_name = RoomId::from(req.room_name);
    let sender_id = Identity::from(req.sender_id);

    let message = state.chat.send(
        &room_name,
        sender_id.clone(),
        req.content,
        kind,
        req.mentioned_users.into_iter().map(Identity::from).collect(),
        req.reply_to,
    )?;

    // Analytics is best-effort; a stream without an aggregator is fine
    let _ = state.analytics.chat_message(&room_name, &sender_id);

    Ok(Json(message))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let before = query
        .before
        .as_deref()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| AppError::bad_request("before must be RFC 3339"))
        })
        .transpose()?;

    let messages = state.chat.messages(
        &RoomId::from(query.room_name),
        query.limit.unwrap_or(50).min(100),
        before,
    )?;
    Ok(Json(messages))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Json(req): Json<DeleteMessageRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.chat.delete_message(
        &RoomId::from(req.room_name),
        &req.message_id,
        &Identity::from(req.moderator_id),
    )?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn mute_participant(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.chat.mute(
        &RoomId::from(req.room_name),
        &Identity::from(req.participant_id),
        &Identity::from(req.moderator_id),
        Duration::from_secs(req.duration_secs),
    )?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn ban_participant(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.chat.ban(
        &RoomId::from(req.room_name),
        &Identity::from(req.participant_id),
        &Identity::from(req.moderator_id),
        Duration::from_secs(req.duration_secs),
    )?;
    Ok(Json(SuccessResponse { success: true }))
}
