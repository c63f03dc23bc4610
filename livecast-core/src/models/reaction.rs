use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::{Identity, RoomId};

/// The fixed set of reactions a viewer can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    Like,
    Heart,
    Wow,
    Laugh,
    Sad,
    Fire,
    Clap,
    Party,
}

impl ReactionType {
    /// Parse a wire name, rejecting anything outside the fixed enumeration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "heart" => Some(Self::Heart),
            "wow" => Some(Self::Wow),
            "laugh" => Some(Self::Laugh),
            "sad" => Some(Self::Sad),
            "fire" => Some(Self::Fire),
            "clap" => Some(Self::Clap),
            "party" => Some(Self::Party),
            _ => None,
        }
    }
}

/// Unit-square point where an animated reaction appears on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub room_name: RoomId,
    pub user_id: Identity,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: ReactionType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<ReactionPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopReactor {
    pub user_id: Identity,
    pub user_name: String,
    pub reaction_count: u64,
}

/// Running reaction summary for a room.
///
/// `total_reactions` and `reaction_counts` are running totals; the TTL
/// sweep removes old reactions from the log without decrementing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionStats {
    pub room_name: RoomId,
    pub total_reactions: u64,
    pub reaction_counts: HashMap<ReactionType, u64>,
    pub top_reactors: Vec<TopReactor>,
    pub recent_reactions: Vec<Reaction>,
    pub last_updated: DateTime<Utc>,
}

impl ReactionStats {
    #[must_use]
    pub fn new(room_name: RoomId) -> Self {
        Self {
            room_name,
            total_reactions: 0,
            reaction_counts: HashMap::new(),
            top_reactors: Vec::new(),
            recent_reactions: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}
