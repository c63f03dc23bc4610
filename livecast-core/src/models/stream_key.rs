use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::{Identity, RoomId};

/// What a stream key permits its holder to do
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPermissions {
    pub can_publish_video: bool,
    pub can_publish_audio: bool,
    pub can_screen_share: bool,
    pub can_record: bool,
    pub max_viewers: u32,
    pub max_duration_mins: u32,
    pub enable_chat: bool,
    pub enable_reactions: bool,
    pub enable_moderation: bool,
}

impl Default for StreamPermissions {
    fn default() -> Self {
        Self {
            can_publish_video: true,
            can_publish_audio: true,
            can_screen_share: true,
            can_record: false,
            max_viewers: 10_000,
            max_duration_mins: 180,
            enable_chat: true,
            enable_reactions: true,
            enable_moderation: true,
        }
    }
}

/// Long-lived opaque credential identifying a streamer and their room.
///
/// Valid iff `is_active` and not past `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamKey {
    pub key: String,
    pub streamer_id: Identity,
    pub room_name: RoomId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub usage_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub permissions: StreamPermissions,
}
