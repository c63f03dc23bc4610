use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::{Identity, RoomId};
use super::reaction::ReactionType;

/// A metric value at a point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-stream analytics record.
///
/// Counters are updated on event; derived metrics are recomputed on each
/// sample tick, on snapshot reads, and on finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamAnalytics {
    pub room_name: RoomId,
    pub streamer_id: Identity,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: f64,

    // Viewer metrics
    pub total_viewers: u64,
    pub peak_viewers: u64,
    pub current_viewers: u64,
    pub unique_viewers: u64,
    /// Closed sessions over total joins, percent
    pub viewer_retention: f64,
    pub average_watch_secs: f64,

    // Chat metrics
    pub total_messages: u64,
    pub unique_messagers: u64,
    pub messages_per_minute: f64,

    // Reaction metrics
    pub total_reactions: u64,
    pub reactions_per_minute: f64,
    pub reaction_breakdown: HashMap<ReactionType, u64>,

    // Technical metrics
    pub peak_bitrate: u32,

    // Dimensional breakdowns
    pub viewers_by_country: HashMap<String, u64>,
    pub viewers_by_region: HashMap<String, u64>,
    pub viewers_by_platform: HashMap<String, u64>,
    pub viewers_by_device: HashMap<String, u64>,

    // Bounded time series
    pub viewer_timeline: Vec<TimeSeriesPoint>,
    pub chat_timeline: Vec<TimeSeriesPoint>,
    pub reaction_timeline: Vec<TimeSeriesPoint>,
    pub bitrate_timeline: Vec<TimeSeriesPoint>,

    pub last_updated: DateTime<Utc>,
}

impl StreamAnalytics {
    #[must_use]
    pub fn new(room_name: RoomId, streamer_id: Identity) -> Self {
        let now = Utc::now();
        Self {
            room_name,
            streamer_id,
            start_time: now,
            end_time: None,
            duration_secs: 0.0,
            total_viewers: 0,
            peak_viewers: 0,
            current_viewers: 0,
            unique_viewers: 0,
            viewer_retention: 0.0,
            average_watch_secs: 0.0,
            total_messages: 0,
            unique_messagers: 0,
            messages_per_minute: 0.0,
            total_reactions: 0,
            reactions_per_minute: 0.0,
            reaction_breakdown: HashMap::new(),
            peak_bitrate: 0,
            viewers_by_country: HashMap::new(),
            viewers_by_region: HashMap::new(),
            viewers_by_platform: HashMap::new(),
            viewers_by_device: HashMap::new(),
            viewer_timeline: Vec::new(),
            chat_timeline: Vec::new(),
            reaction_timeline: Vec::new(),
            bitrate_timeline: Vec::new(),
            last_updated: now,
        }
    }
}

/// One viewer's presence in a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSession {
    pub viewer_id: Identity,
    pub room_name: RoomId,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
    pub watch_secs: f64,
    pub messages_sent: u64,
    pub reactions_sent: u64,
    pub platform: String,
    pub device: String,
    pub country: String,
    pub region: String,
    pub quality_level: String,
}

impl ViewerSession {
    #[must_use]
    pub fn open(
        viewer_id: Identity,
        room_name: RoomId,
        platform: String,
        device: String,
        country: String,
        region: String,
    ) -> Self {
        Self {
            viewer_id,
            room_name,
            joined_at: Utc::now(),
            left_at: None,
            watch_secs: 0.0,
            messages_sent: 0,
            reactions_sent: 0,
            platform,
            device,
            country,
            region,
            quality_level: "auto".to_string(),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.left_at.is_none()
    }
}
