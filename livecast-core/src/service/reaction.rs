//! Reaction engine
//!
//! High-frequency ephemeral per-room events with dual-window rate limiting,
//! a top-reactor leaderboard, and TTL sweeping. Rooms are created lazily on
//! first reaction.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    config::ReactionConfig,
    models::{Identity, Reaction, ReactionPosition, ReactionStats, ReactionType, RoomId, TopReactor},
    Error, Result,
};

/// Per-sender counters for the two rate-limit windows
struct RateWindow {
    second_start: DateTime<Utc>,
    second_count: u32,
    minute_start: DateTime<Utc>,
    minute_count: u32,
}

struct ReactionRoom {
    reactions: Vec<Reaction>,
    user_reactions: HashMap<Identity, Vec<Reaction>>,
    rate_limits: HashMap<Identity, RateWindow>,
    stats: ReactionStats,
}

impl ReactionRoom {
    fn new(room_name: RoomId) -> Self {
        Self {
            reactions: Vec::new(),
            user_reactions: HashMap::new(),
            rate_limits: HashMap::new(),
            stats: ReactionStats::new(room_name),
        }
    }
}

/// Manages reactions across all stream rooms
pub struct ReactionEngine {
    rooms: RwLock<HashMap<RoomId, Arc<RwLock<ReactionRoom>>>>,
    config: ReactionConfig,
    events: broadcast::Sender<Reaction>,
}

impl ReactionEngine {
    #[must_use]
    pub fn new(config: ReactionConfig) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            events,
        }
    }

    /// Subscribe to every appended reaction.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Reaction> {
        self.events.subscribe()
    }

    pub fn create_room(&self, room_name: RoomId) -> Result<()> {
        let mut rooms = self.rooms.write();
        if rooms.contains_key(&room_name) {
            return Err(Error::AlreadyExists(
                "reaction room already exists".to_string(),
            ));
        }
        rooms.insert(
            room_name.clone(),
            Arc::new(RwLock::new(ReactionRoom::new(room_name.clone()))),
        );
        info!(room_name = %room_name, "created reaction room");
        Ok(())
    }

    pub fn delete_room(&self, room_name: &RoomId) {
        self.rooms.write().remove(room_name);
        info!(room_name = %room_name, "deleted reaction room");
    }

    /// Append a reaction.
    ///
    /// Both rate-limit windows are checked before the append; the sender's
    /// window counter only advances on success.
    pub fn send(
        &self,
        room_name: &RoomId,
        user_id: Identity,
        user_name: String,
        kind: ReactionType,
        position: Option<ReactionPosition>,
    ) -> Result<Reaction> {
        let room = self.room_or_create(room_name);

        let reaction = {
            let mut room = room.write();

            if self.config.enable_rate_limit {
                self.check_rate_limit(&room, &user_id)?;
            }

            let now = Utc::now();
            let reaction = Reaction {
                id: format!(
                    "reaction-{}-{}",
                    now.timestamp_nanos_opt().unwrap_or_default(),
                    user_id
                ),
                room_name: room_name.clone(),
                user_id: user_id.clone(),
                user_name,
                kind,
                timestamp: now,
                position,
            };

            room.reactions.push(reaction.clone());
            room.user_reactions
                .entry(user_id.clone())
                .or_default()
                .push(reaction.clone());

            room.stats.total_reactions += 1;
            *room.stats.reaction_counts.entry(kind).or_insert(0) += 1;
            room.stats.recent_reactions.insert(0, reaction.clone());
            room.stats.recent_reactions.truncate(self.config.max_recent);
            room.stats.last_updated = now;

            if self.config.enable_leaderboard {
                Self::update_top_reactors(&mut room);
            }

            Self::advance_rate_window(&mut room, &user_id, now);

            reaction
        };

        debug!(
            room_name = %room_name,
            user_id = %reaction.user_id,
            kind = ?kind,
            "reaction sent"
        );

        let _ = self.events.send(reaction.clone());
        Ok(reaction)
    }

    /// Up to `limit` reactions, newest first.
    pub fn recent(&self, room_name: &RoomId, limit: usize) -> Result<Vec<Reaction>> {
        let room = self.room(room_name)?;
        let room = room.read();
        Ok(room.reactions.iter().rev().take(limit).cloned().collect())
    }

    pub fn user_reactions(&self, room_name: &RoomId, user_id: &Identity) -> Result<Vec<Reaction>> {
        let room = self.room(room_name)?;
        let room = room.read();
        Ok(room.user_reactions.get(user_id).cloned().unwrap_or_default())
    }

    pub fn stats(&self, room_name: &RoomId) -> Result<ReactionStats> {
        let room = self.room(room_name)?;
        let room = room.read();
        Ok(room.stats.clone())
    }

    pub fn top_reactors(&self, room_name: &RoomId, limit: usize) -> Result<Vec<TopReactor>> {
        let room = self.room(room_name)?;
        let room = room.read();
        Ok(room.stats.top_reactors.iter().take(limit).cloned().collect())
    }

    /// Drop reactions older than the TTL from each room's log and per-user
    /// index. Stats are running totals and are not decremented.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now()
            - ChronoDuration::seconds(self.config.ttl_secs as i64);

        let rooms: Vec<Arc<RwLock<ReactionRoom>>> =
            self.rooms.read().values().cloned().collect();

        let mut total_cleaned = 0;
        for room in rooms {
            let mut room = room.write();
            let before = room.reactions.len();
            room.reactions.retain(|r| r.timestamp > cutoff);
            total_cleaned += before - room.reactions.len();

            for reactions in room.user_reactions.values_mut() {
                reactions.retain(|r| r.timestamp > cutoff);
            }
        }

        if total_cleaned > 0 {
            info!(count = total_cleaned, "cleaned up old reactions");
        }
        total_cleaned
    }

    /// Both windows are checked together: the per-second window caps
    /// bursts, the per-minute window caps sustained volume.
    fn check_rate_limit(&self, room: &ReactionRoom, user_id: &Identity) -> Result<()> {
        let Some(window) = room.rate_limits.get(user_id) else {
            return Ok(());
        };

        let now = Utc::now();

        if now - window.second_start < ChronoDuration::seconds(1)
            && window.second_count >= self.config.max_per_second
        {
            return Err(Error::RateLimited(
                "too many reactions per second".to_string(),
            ));
        }

        if now - window.minute_start < ChronoDuration::minutes(1)
            && window.minute_count >= self.config.max_per_minute
        {
            return Err(Error::RateLimited(
                "too many reactions per minute".to_string(),
            ));
        }

        Ok(())
    }

    fn advance_rate_window(room: &mut ReactionRoom, user_id: &Identity, now: DateTime<Utc>) {
        let window = room
            .rate_limits
            .entry(user_id.clone())
            .or_insert_with(|| RateWindow {
                second_start: now,
                second_count: 0,
                minute_start: now,
                minute_count: 0,
            });

        if now - window.second_start >= ChronoDuration::seconds(1) {
            window.second_start = now;
            window.second_count = 0;
        }
        if now - window.minute_start >= ChronoDuration::minutes(1) {
            window.minute_start = now;
            window.minute_count = 0;
        }

        window.second_count += 1;
        window.minute_count += 1;
    }

    fn update_top_reactors(room: &mut ReactionRoom) {
        let mut top: Vec<TopReactor> = room
            .user_reactions
            .iter()
            .filter(|(_, reactions)| !reactions.is_empty())
            .map(|(user_id, reactions)| TopReactor {
                user_id: user_id.clone(),
                user_name: reactions[0].user_name.clone(),
                reaction_count: reactions.len() as u64,
            })
            .collect();

        // Stable sort: ties keep their relative order
        top.sort_by(|a, b| b.reaction_count.cmp(&a.reaction_count));
        top.truncate(10);
        room.stats.top_reactors = top;
    }

    fn room(&self, room_name: &RoomId) -> Result<Arc<RwLock<ReactionRoom>>> {
        self.rooms
            .read()
            .get(room_name)
            .cloned()
            .ok_or_else(|| Error::NotFound("reaction room not found".to_string()))
    }

    fn room_or_create(&self, room_name: &RoomId) -> Arc<RwLock<ReactionRoom>> {
        if let Some(room) = self.rooms.read().get(room_name) {
            return Arc::clone(room);
        }
        let mut rooms = self.rooms.write();
        Arc::clone(
            rooms
                .entry(room_name.clone())
                .or_insert_with(|| Arc::new(RwLock::new(ReactionRoom::new(room_name.clone())))),
        )
    }
}
