//! WebSocket push endpoints
//!
//! Three long-lived channels: chat, reactions, and notifications. Each
//! upgrade subscribes the connection to the relevant engine's fan-out and
//! forwards events as JSON envelopes. A bounded per-connection buffer with
//! `try_send` keeps a slow client from backpressuring the engine: the
//! client's messages are dropped, not the engine's throughput.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

use crate::http::{AppError, AppState};
use livecast_core::models::{ChatMessageKind, Identity, RoomId};

/// Per-connection outbound buffer; beyond this the client is too slow
const OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
pub struct ChatWsQuery {
    pub room_name: String,
    pub identity: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_moderator: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReactionsWsQuery {
    pub room_name: String,
    pub identity: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationsWsQuery {
    pub identity: String,
}

#[derive(Debug, Deserialize)]
struct IncomingChatMessage {
    content: String,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    mentioned_users: Vec<String>,
    #[serde(default)]
    reply_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncomingReaction {
    reaction_type: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

/// Chat channel. Joining happens before the upgrade so a banned identity
/// gets a proper HTTP status instead of an immediate close.
pub async fn chat_ws(
    State(state): State<AppState>,
    Query(query): Query<ChatWsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let room_name = RoomId::from(query.room_name);
    let identity = Identity::from(query.identity);
    let name = query.name.unwrap_or_else(|| identity.as_str().to_string());

    state
        .chat
        .join(&room_name, identity.clone(), name, query.is_moderator)?;

    Ok(ws.on_upgrade(move |socket| handle_chat_socket(socket, state, room_name, identity)))
}

async fn handle_chat_socket(
    socket: WebSocket,
    state: AppState,
    room_name: RoomId,
    identity: Identity,
) {
    info!(room_name = %room_name, identity = %identity, "chat websocket connected");

    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let writer = spawn_writer(ws_sink, rx);

    // Forward every message appended to this room, in append order
    let mut events = state.chat.subscribe();
    let forward_tx = tx.clone();
    let forward_room = room_name.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(msg) if msg.room_name == forward_room => {
                    let envelope = json!({"type": "chat_message", "data": msg}).to_string();
                    if forward(&forward_tx, envelope).is_break() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "chat listener lagged, messages dropped");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });

    while let Some(received) = ws_stream.next().await {
        let Ok(message) = received else { break };
        match message {
            Message::Text(text) => {
                let incoming: IncomingChatMessage = match serde_json::from_str(&text) {
                    Ok(incoming) => incoming,
                    Err(e) => {
                        send_error(&tx, &format!("malformed message: {e}"));
                        continue;
                    }
                };

                let kind = match incoming.message_type.as_deref() {
                    None | Some("text") => ChatMessageKind::Text,
                    Some("emoji") => ChatMessageKind::Emoji,
                    Some("gift") => ChatMessageKind::Gift,
                    Some(other) => {
                        send_error(&tx, &format!("unknown message_type: {other}"));
                        continue;
                    }
                };

                match state.chat.send(
                    &room_name,
                    identity.clone(),
                    incoming.content,
                    kind,
                    incoming.mentioned_users.into_iter().map(Identity::from).collect(),
                    incoming.reply_to,
                ) {
                    Ok(_) => {
                        let _ = state.analytics.chat_message(&room_name, &identity);
                    }
                    Err(e) => send_error(&tx, &e.to_string()),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    forwarder.abort();
    drop(tx);
    let _ = writer.await;

    if let Err(e) = state.chat.leave(&room_name, &identity) {
        debug!(room_name = %room_name, identity = %identity, error = %e, "leave after disconnect");
    }
    info!(room_name = %room_name, identity = %identity, "chat websocket closed");
}

/// Reaction channel. Rooms are lazily created, so there is nothing to
/// check before the upgrade.
pub async fn reactions_ws(
    State(state): State<AppState>,
    Query(query): Query<ReactionsWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let room_name = RoomId::from(query.room_name);
    let identity = Identity::from(query.identity);
    let name = query.name.unwrap_or_else(|| identity.as_str().to_string());

    ws.on_upgrade(move |socket| handle_reactions_socket(socket, state, room_name, identity, name))
}

async fn handle_reactions_socket(
    socket: WebSocket,
    state: AppState,
    room_name: RoomId,
    identity: Identity,
    name: String,
) {
    info!(room_name = %room_name, identity = %identity, "reactions websocket connected");

    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let writer = spawn_writer(ws_sink, rx);

    let mut events = state.reactions.subscribe();
    let forward_tx = tx.clone();
    let forward_room = room_name.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(reaction) if reaction.room_name == forward_room => {
                    let envelope = json!({"type": "reaction", "data": reaction}).to_string();
                    if forward(&forward_tx, envelope).is_break() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "reaction listener lagged, events dropped");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });

    while let Some(received) = ws_stream.next().await {
        let Ok(message) = received else { break };
        match message {
            Message::Text(text) => {
                let incoming: IncomingReaction = match serde_json::from_str(&text) {
                    Ok(incoming) => incoming,
                    Err(e) => {
                        send_error(&tx, &format!("malformed reaction: {e}"));
                        continue;
                    }
                };

                let Some(kind) =
                    livecast_core::models::ReactionType::parse(&incoming.reaction_type)
                else {
                    send_error(
                        &tx,
                        &format!("unknown reaction_type: {}", incoming.reaction_type),
                    );
                    continue;
                };

                let position = match (incoming.x, incoming.y) {
                    (Some(x), Some(y)) => {
                        Some(livecast_core::models::ReactionPosition { x, y })
                    }
                    _ => None,
                };

                match state.reactions.send(
                    &room_name,
                    identity.clone(),
                    name.clone(),
                    kind,
                    position,
                ) {
                    Ok(_) => {
                        let _ = state.analytics.reaction(&room_name, &identity, kind);
                    }
                    Err(e) => send_error(&tx, &e.to_string()),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    forwarder.abort();
    drop(tx);
    let _ = writer.await;
    info!(room_name = %room_name, identity = %identity, "reactions websocket closed");
}

/// Notification channel: push-only, scoped to one identity.
pub async fn notifications_ws(
    State(state): State<AppState>,
    Query(query): Query<NotificationsWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = Identity::from(query.identity);
    ws.on_upgrade(move |socket| handle_notifications_socket(socket, state, identity))
}

async fn handle_notifications_socket(socket: WebSocket, state: AppState, identity: Identity) {
    info!(identity = %identity, "notifications websocket connected");

    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let writer = spawn_writer(ws_sink, rx);

    let mut events = state.notifications.subscribe_events();
    let forward_identity = identity.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(notification) if notification.user_id == forward_identity => {
                    let envelope =
                        json!({"type": "notification", "data": notification}).to_string();
                    if forward(&tx, envelope).is_break() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "notification listener lagged, events dropped");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });

    // Push-only: drain the client side until it goes away
    while let Some(received) = ws_stream.next().await {
        match received {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    forwarder.abort();
    let _ = writer.await;
    info!(identity = %identity, "notifications websocket closed");
}

fn spawn_writer(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                warn!(error = %e, "failed to send websocket message");
                break;
            }
        }
    })
}

/// Queue an envelope for the writer. Full buffer means the client is too
/// slow: the envelope is dropped. A closed buffer ends the forwarder.
fn forward(tx: &mpsc::Sender<String>, envelope: String) -> std::ops::ControlFlow<()> {
    match tx.try_send(envelope) {
        Ok(()) => std::ops::ControlFlow::Continue(()),
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("websocket client too slow, envelope dropped");
            std::ops::ControlFlow::Continue(())
        }
        Err(mpsc::error::TrySendError::Closed(_)) => std::ops::ControlFlow::Break(()),
    }
}

fn send_error(tx: &mpsc::Sender<String>, message: &str) {
    let envelope = json!({"type": "error", "error": message}).to_string();
    let _ = tx.try_send(envelope);
}
