use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{Identity, RoomId};

/// Sender identity reserved for engine-generated messages
pub const SYSTEM_SENDER: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageKind {
    Text,
    Emoji,
    System,
    Gift,
    JoinLeave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_name: RoomId,
    pub sender_id: Identity,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: ChatMessageKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_users: Vec<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub is_deleted: bool,
    pub is_moderated: bool,
}

impl ChatMessage {
    /// Build a system message for join/leave announcements.
    #[must_use]
    pub fn system(room_name: RoomId, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: format!("sys-{}", now.timestamp_nanos_opt().unwrap_or_default()),
            room_name,
            sender_id: Identity::from(SYSTEM_SENDER),
            sender_name: "System".to_string(),
            content,
            timestamp: now,
            message_type: ChatMessageKind::JoinLeave,
            mentioned_users: Vec::new(),
            reply_to: None,
            is_deleted: false,
            is_moderated: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub identity: Identity,
    pub name: String,
    pub is_moderator: bool,
    pub is_muted: bool,
    pub joined_at: DateTime<Utc>,
    pub message_count: u64,
}

/// Per-room chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRoomSettings {
    pub max_message_length: usize,
    pub max_messages_per_min: usize,
    pub enable_emojis: bool,
    pub enable_mentions: bool,
    pub enable_moderation: bool,
    pub slow_mode_delay_secs: u64,
    pub require_verification: bool,
    pub enable_bad_words: bool,
}

impl Default for ChatRoomSettings {
    fn default() -> Self {
        Self {
            max_message_length: 500,
            max_messages_per_min: 20,
            enable_emojis: true,
            enable_mentions: true,
            enable_moderation: true,
            slow_mode_delay_secs: 0,
            require_verification: false,
            enable_bad_words: true,
        }
    }
}

/// Summary returned by room creation and lookups; the full message log is
/// paginated separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoomInfo {
    pub room_name: RoomId,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub participant_count: usize,
}
