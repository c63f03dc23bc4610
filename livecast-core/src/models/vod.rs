use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::{Identity, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VodStatus {
    Recording,
    Processing,
    Ready,
    Failed,
    Archived,
    Deleted,
}

impl VodStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

/// A recorded stream and its catalog entry.
///
/// Status transitions are strictly forward:
/// recording -> processing -> ready -> (archived | deleted), with failed
/// reachable from recording/processing. `published_at` implies `ready`
/// and `is_public`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodRecording {
    pub id: String,
    pub room_name: RoomId,
    pub streamer_id: Identity,
    pub streamer_name: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub file_size: i64,
    pub duration_secs: f64,
    pub status: VodStatus,
    pub view_count: u64,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub average_watch_secs: f64,
    pub peak_viewers: u32,
}

/// Metadata key the coordinator stores the encoder job id under
pub const EGRESS_ID_KEY: &str = "egress_id";

/// A single user's ongoing watch of a recording.
///
/// `completed` latches true once `position_secs` crosses the completion
/// threshold of the recording duration and never resets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub id: String,
    pub recording_id: String,
    pub user_id: Identity,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub position_secs: f64,
    pub watch_secs: f64,
    pub completed: bool,
    pub quality: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&VodStatus::Recording).unwrap(),
            r#""recording""#
        );
        assert_eq!(VodStatus::Processing.as_str(), "processing");
    }
}
