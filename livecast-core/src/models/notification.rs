use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StreamStarted,
    StreamEnded,
    NewFollower,
    Mention,
    Reply,
    Moderator,
    Gift,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: Identity,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action_url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
}

impl Notification {
    #[must_use]
    pub fn new(
        user_id: Identity,
        kind: NotificationKind,
        title: String,
        body: String,
        priority: NotificationPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!(
                "notif-{}-{}",
                now.timestamp_nanos_opt().unwrap_or_default(),
                user_id
            ),
            user_id,
            kind,
            title,
            body,
            action_url: String::new(),
            data: HashMap::new(),
            priority,
            created_at: now,
            read_at: None,
            is_read: false,
        }
    }
}

/// A follower's notification preferences for one streamer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: Identity,
    pub streamer_id: Identity,
    pub streamer_name: String,
    pub notify_stream_start: bool,
    pub notify_stream_end: bool,
    pub notify_chat: bool,
    pub notify_mentions: bool,
    pub created_at: DateTime<Utc>,
}

/// Preference bits supplied at subscribe time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionPrefs {
    pub notify_stream_start: bool,
    pub notify_stream_end: bool,
    pub notify_chat: bool,
    pub notify_mentions: bool,
}

impl Default for SubscriptionPrefs {
    fn default() -> Self {
        Self {
            notify_stream_start: true,
            notify_stream_end: false,
            notify_chat: false,
            notify_mentions: true,
        }
    }
}
