//! Chat engine
//!
//! Per-room message logs with rate limiting, slow mode, moderator actions,
//! and broadcast fan-out to subscribed listeners. Room state lives behind a
//! per-room lock; the engine lock only guards the room map. No lock is held
//! across a fan-out send.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    models::{
        ChatMessage, ChatMessageKind, ChatParticipant, ChatRoomInfo, ChatRoomSettings, Identity,
        RoomId,
    },
    service::ContentFilter,
    Error, Result,
};

struct ChatRoom {
    room_name: RoomId,
    messages: Vec<ChatMessage>,
    participants: HashMap<Identity, ChatParticipant>,
    moderators: HashSet<Identity>,
    banned: HashMap<Identity, DateTime<Utc>>,
    created_at: DateTime<Utc>,
    settings: ChatRoomSettings,
}

impl ChatRoom {
    fn new(room_name: RoomId, settings: ChatRoomSettings) -> Self {
        Self {
            room_name,
            messages: Vec::new(),
            participants: HashMap::new(),
            moderators: HashSet::new(),
            banned: HashMap::new(),
            created_at: Utc::now(),
            settings,
        }
    }

    /// Messages from `sender` within the trailing window, scanning from the
    /// newest entry until the window is left.
    fn recent_message_count(&self, sender: &Identity, window: ChronoDuration) -> usize {
        let cutoff = Utc::now() - window;
        let mut count = 0;
        for msg in self.messages.iter().rev() {
            if msg.timestamp < cutoff {
                break;
            }
            if &msg.sender_id == sender {
                count += 1;
            }
        }
        count
    }

    fn last_message_from(&self, sender: &Identity) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| &m.sender_id == sender)
    }
}

/// Manages all chat rooms
pub struct ChatEngine {
    rooms: RwLock<HashMap<RoomId, Arc<RwLock<ChatRoom>>>>,
    filter: ContentFilter,
    events: broadcast::Sender<ChatMessage>,
}

impl ChatEngine {
    #[must_use]
    pub fn new(filter: ContentFilter, channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity);
        Self {
            rooms: RwLock::new(HashMap::new()),
            filter,
            events,
        }
    }

    /// Subscribe to every appended message (system ones included).
    /// Listeners filter by room; a lagging receiver drops messages instead
    /// of backpressuring the engine.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.events.subscribe()
    }

    pub fn create_room(
        &self,
        room_name: RoomId,
        settings: Option<ChatRoomSettings>,
    ) -> Result<ChatRoomInfo> {
        let mut rooms = self.rooms.write();
        if rooms.contains_key(&room_name) {
            return Err(Error::AlreadyExists("chat room already exists".to_string()));
        }

        let room = ChatRoom::new(room_name.clone(), settings.unwrap_or_default());
        let info = ChatRoomInfo {
            room_name: room_name.clone(),
            created_at: room.created_at,
            message_count: 0,
            participant_count: 0,
        };
        rooms.insert(room_name.clone(), Arc::new(RwLock::new(room)));

        info!(room_name = %room_name, "created chat room");
        Ok(info)
    }

    #[must_use]
    pub fn room_info(&self, room_name: &RoomId) -> Option<ChatRoomInfo> {
        let room = self.room(room_name).ok()?;
        let room = room.read();
        Some(ChatRoomInfo {
            room_name: room.room_name.clone(),
            created_at: room.created_at,
            message_count: room.messages.len(),
            participant_count: room.participants.len(),
        })
    }

    /// Add a participant. A live ban rejects the join; an expired ban is
    /// cleared on the way in. Appends a system join message.
    pub fn join(
        &self,
        room_name: &RoomId,
        identity: Identity,
        name: String,
        is_moderator: bool,
    ) -> Result<ChatMessage> {
        let room = self.room(room_name)?;

        let system_msg = {
            let mut room = room.write();

            if let Some(&ban_expiry) = room.banned.get(&identity) {
                if Utc::now() < ban_expiry {
                    return Err(Error::Authorization(format!(
                        "user is banned until {ban_expiry}"
                    )));
                }
                room.banned.remove(&identity);
            }

            let participant = ChatParticipant {
                identity: identity.clone(),
                name: name.clone(),
                is_moderator,
                is_muted: false,
                joined_at: Utc::now(),
                message_count: 0,
            };
            room.participants.insert(identity.clone(), participant);
            if is_moderator {
                room.moderators.insert(identity.clone());
            }

            let msg =
                ChatMessage::system(room_name.clone(), format!("{name} joined the chat"));
            room.messages.push(msg.clone());
            msg
        };

        info!(
            room_name = %room_name,
            participant_id = %identity,
            is_moderator,
            "participant joined chat"
        );

        let _ = self.events.send(system_msg.clone());
        Ok(system_msg)
    }

    /// Remove a participant and announce it.
    pub fn leave(&self, room_name: &RoomId, identity: &Identity) -> Result<ChatMessage> {
        let room = self.room(room_name)?;

        let system_msg = {
            let mut room = room.write();
            let participant = room
                .participants
                .remove(identity)
                .ok_or_else(|| Error::NotFound("participant not in chat room".to_string()))?;
            room.moderators.remove(identity);

            let msg = ChatMessage::system(
                room_name.clone(),
                format!("{} left the chat", participant.name),
            );
            room.messages.push(msg.clone());
            msg
        };

        let _ = self.events.send(system_msg.clone());
        Ok(system_msg)
    }

    /// Append a message.
    ///
    /// Unknown senders are auto-registered as participants; that behavior is
    /// part of the contract. Enforces mute, length, the per-minute rate
    /// limit, and slow mode, then masks bad words before the append.
    pub fn send(
        &self,
        room_name: &RoomId,
        sender_id: Identity,
        content: String,
        message_type: ChatMessageKind,
        mentioned_users: Vec<Identity>,
        reply_to: Option<String>,
    ) -> Result<ChatMessage> {
        let room = self.room(room_name)?;

        let message = {
            let mut room = room.write();

            let sender_name = match room.participants.get(&sender_id) {
                Some(p) => {
                    if p.is_muted {
                        return Err(Error::Authorization("participant is muted".to_string()));
                    }
                    p.name.clone()
                }
                None => {
                    let participant = ChatParticipant {
                        identity: sender_id.clone(),
                        name: sender_id.as_str().to_string(),
                        is_moderator: false,
                        is_muted: false,
                        joined_at: Utc::now(),
                        message_count: 0,
                    };
                    let name = participant.name.clone();
                    room.participants.insert(sender_id.clone(), participant);
                    name
                }
            };

            if content.len() > room.settings.max_message_length {
                return Err(Error::InvalidInput("message too long".to_string()));
            }

            if room.recent_message_count(&sender_id, ChronoDuration::minutes(1))
                >= room.settings.max_messages_per_min
            {
                return Err(Error::RateLimited(
                    "too many messages per minute".to_string(),
                ));
            }

            if room.settings.slow_mode_delay_secs > 0 {
                let delay = ChronoDuration::seconds(room.settings.slow_mode_delay_secs as i64);
                if let Some(last) = room.last_message_from(&sender_id) {
                    if Utc::now() - last.timestamp < delay {
                        return Err(Error::RateLimited(
                            "slow mode active, please wait".to_string(),
                        ));
                    }
                }
            }

            let content = if room.settings.enable_bad_words {
                self.filter.mask(&content)
            } else {
                content
            };

            let now = Utc::now();
            let message = ChatMessage {
                id: format!(
                    "msg-{}-{}",
                    now.timestamp_nanos_opt().unwrap_or_default(),
                    sender_id
                ),
                room_name: room_name.clone(),
                sender_id: sender_id.clone(),
                sender_name,
                content,
                timestamp: now,
                message_type,
                mentioned_users,
                reply_to,
                is_deleted: false,
                is_moderated: false,
            };

            room.messages.push(message.clone());
            if let Some(p) = room.participants.get_mut(&sender_id) {
                p.message_count += 1;
            }
            message
        };

        debug!(
            room_name = %room_name,
            sender_id = %sender_id,
            message_type = ?message_type,
            "chat message sent"
        );

        let _ = self.events.send(message.clone());
        Ok(message)
    }

    /// Flag a message deleted. The entry stays in the log with a stable id;
    /// reads skip it.
    pub fn delete_message(
        &self,
        room_name: &RoomId,
        message_id: &str,
        moderator_id: &Identity,
    ) -> Result<()> {
        let room = self.room(room_name)?;
        let mut room = room.write();

        if !room.moderators.contains(moderator_id) {
            return Err(Error::Authorization("user is not a moderator".to_string()));
        }

        let msg = room
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::NotFound("message not found".to_string()))?;

        msg.is_deleted = true;
        msg.is_moderated = true;

        info!(
            message_id,
            moderator_id = %moderator_id,
            "message deleted by moderator"
        );
        Ok(())
    }

    /// Mute a participant. A positive duration schedules the unmute on a
    /// background task; mute state does not survive a restart.
    pub fn mute(
        &self,
        room_name: &RoomId,
        participant_id: &Identity,
        moderator_id: &Identity,
        duration: Duration,
    ) -> Result<()> {
        let room = self.room(room_name)?;

        {
            let mut room = room.write();
            if !room.moderators.contains(moderator_id) {
                return Err(Error::Authorization("user is not a moderator".to_string()));
            }

            let participant = room
                .participants
                .get_mut(participant_id)
                .ok_or_else(|| Error::NotFound("participant not found".to_string()))?;
            participant.is_muted = true;
        }

        if duration > Duration::ZERO {
            let room = Arc::clone(&room);
            let participant_id = participant_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                let mut room = room.write();
                if let Some(p) = room.participants.get_mut(&participant_id) {
                    p.is_muted = false;
                }
            });
        }

        info!(
            participant_id = %participant_id,
            moderator_id = %moderator_id,
            duration_secs = duration.as_secs(),
            "participant muted"
        );
        Ok(())
    }

    /// Ban a participant for `duration` and drop them from the room.
    /// Joins fail until the window passes.
    pub fn ban(
        &self,
        room_name: &RoomId,
        participant_id: &Identity,
        moderator_id: &Identity,
        duration: Duration,
    ) -> Result<()> {
        let room = self.room(room_name)?;
        let mut room = room.write();

        if !room.moderators.contains(moderator_id) {
            return Err(Error::Authorization("user is not a moderator".to_string()));
        }

        let ban_expiry = Utc::now()
            + ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::zero());
        room.banned.insert(participant_id.clone(), ban_expiry);
        room.participants.remove(participant_id);

        info!(
            participant_id = %participant_id,
            moderator_id = %moderator_id,
            until = %ban_expiry,
            "participant banned"
        );
        Ok(())
    }

    /// Up to `limit` non-deleted messages, newest first. With `before` set,
    /// only strictly older messages are returned.
    pub fn messages(
        &self,
        room_name: &RoomId,
        limit: usize,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>> {
        let room = self.room(room_name)?;
        let room = room.read();

        let mut out = Vec::new();
        for msg in room.messages.iter().rev() {
            if out.len() >= limit {
                break;
            }
            if before.is_some_and(|b| msg.timestamp >= b) {
                continue;
            }
            if !msg.is_deleted {
                out.push(msg.clone());
            }
        }
        Ok(out)
    }

    fn room(&self, room_name: &RoomId) -> Result<Arc<RwLock<ChatRoom>>> {
        self.rooms
            .read()
            .get(room_name)
            .cloned()
            .ok_or_else(|| Error::NotFound("chat room not found".to_string()))
    }
}
