//! Analytics aggregator
//!
//! Long-lived per-room aggregators: event-driven counters, unique-viewer
//! accounting, a periodic sampling ticker, and derived metrics. Counters
//! update on event; derived metrics recompute on sample, snapshot, and
//! finalize.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::AnalyticsConfig,
    models::{Identity, ReactionType, RoomId, StreamAnalytics, TimeSeriesPoint, ViewerSession},
    Error, Result,
};

#[derive(Default)]
struct AnalyticsState {
    streams: HashMap<RoomId, StreamAnalytics>,
    sessions: HashMap<RoomId, HashMap<Identity, ViewerSession>>,
}

pub struct AnalyticsEngine {
    inner: RwLock<AnalyticsState>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    #[must_use]
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            inner: RwLock::new(AnalyticsState::default()),
            config,
        }
    }

    /// Begin aggregating a stream. Spawns the sampling ticker, which runs
    /// until the stream is finalized or its record is swept.
    pub fn start(
        self: &Arc<Self>,
        room_name: RoomId,
        streamer_id: Identity,
    ) -> Result<StreamAnalytics> {
        let analytics = {
            let mut state = self.inner.write();
            if state.streams.contains_key(&room_name) {
                return Err(Error::AlreadyExists(
                    "analytics already started for this stream".to_string(),
                ));
            }

            let analytics = StreamAnalytics::new(room_name.clone(), streamer_id.clone());
            state.streams.insert(room_name.clone(), analytics.clone());
            state.sessions.insert(room_name.clone(), HashMap::new());
            analytics
        };

        info!(room_name = %room_name, streamer_id = %streamer_id, "started stream analytics");

        let engine = Arc::clone(self);
        let room = room_name;
        tokio::spawn(async move {
            engine.sample_loop(room).await;
        });

        Ok(analytics)
    }

    /// Finalize a stream: stamp the end, close open sessions, recompute.
    pub fn stop(&self, room_name: &RoomId) -> Result<StreamAnalytics> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found for this stream".to_string()))?;

        let now = Utc::now();
        analytics.end_time = Some(now);
        analytics.duration_secs = (now - analytics.start_time).num_milliseconds() as f64 / 1000.0;

        if let Some(room_sessions) = sessions.get_mut(room_name) {
            for session in room_sessions.values_mut() {
                if session.left_at.is_none() {
                    session.left_at = Some(now);
                    session.watch_secs =
                        (now - session.joined_at).num_milliseconds() as f64 / 1000.0;
                }
            }
        }

        Self::recompute(analytics, sessions.get(room_name));

        info!(
            room_name = %room_name,
            duration_secs = analytics.duration_secs,
            total_viewers = analytics.total_viewers,
            peak_viewers = analytics.peak_viewers,
            "stopped stream analytics"
        );

        Ok(analytics.clone())
    }

    /// Record a viewer joining.
    ///
    /// A join counts toward `total` always, toward `unique` only when the
    /// identity has never had a session in this stream, and toward
    /// `current` only when the identity is not already present (a re-join
    /// while present replaces the session without double-counting).
    pub fn viewer_join(
        &self,
        room_name: &RoomId,
        viewer_id: Identity,
        platform: String,
        device: String,
        country: String,
        region: String,
    ) -> Result<()> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;
        let room_sessions = sessions.entry(room_name.clone()).or_default();

        let prior = room_sessions.get(&viewer_id);
        let is_unique = prior.is_none();
        let was_present = prior.is_some_and(ViewerSession::is_open);

        let session = ViewerSession::open(
            viewer_id.clone(),
            room_name.clone(),
            platform.clone(),
            device.clone(),
            country.clone(),
            region.clone(),
        );
        room_sessions.insert(viewer_id.clone(), session);

        analytics.total_viewers += 1;
        if is_unique {
            analytics.unique_viewers += 1;
        }
        if !was_present {
            analytics.current_viewers += 1;
        }
        if analytics.current_viewers > analytics.peak_viewers {
            analytics.peak_viewers = analytics.current_viewers;
        }

        if !country.is_empty() {
            *analytics.viewers_by_country.entry(country).or_insert(0) += 1;
        }
        if !region.is_empty() {
            *analytics.viewers_by_region.entry(region).or_insert(0) += 1;
        }
        if !platform.is_empty() {
            *analytics.viewers_by_platform.entry(platform).or_insert(0) += 1;
        }
        if !device.is_empty() {
            *analytics.viewers_by_device.entry(device).or_insert(0) += 1;
        }

        debug!(
            room_name = %room_name,
            viewer_id = %viewer_id,
            current_viewers = analytics.current_viewers,
            "viewer joined"
        );
        Ok(())
    }

    /// Record a viewer leaving: closes the session and decrements
    /// `current`, clamped at zero.
    pub fn viewer_leave(&self, room_name: &RoomId, viewer_id: &Identity) -> Result<()> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;

        let session = sessions
            .get_mut(room_name)
            .and_then(|s| s.get_mut(viewer_id))
            .ok_or_else(|| Error::NotFound("session not found".to_string()))?;

        let was_open = session.is_open();
        let now = Utc::now();
        session.left_at = Some(now);
        session.watch_secs = (now - session.joined_at).num_milliseconds() as f64 / 1000.0;

        if was_open {
            analytics.current_viewers = analytics.current_viewers.saturating_sub(1);
        }

        debug!(
            room_name = %room_name,
            viewer_id = %viewer_id,
            watch_secs = session.watch_secs,
            current_viewers = analytics.current_viewers,
            "viewer left"
        );
        Ok(())
    }

    pub fn chat_message(&self, room_name: &RoomId, sender_id: &Identity) -> Result<()> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;
        analytics.total_messages += 1;

        if let Some(session) = sessions.get_mut(room_name).and_then(|s| s.get_mut(sender_id)) {
            session.messages_sent += 1;
        }
        Ok(())
    }

    pub fn reaction(
        &self,
        room_name: &RoomId,
        sender_id: &Identity,
        kind: ReactionType,
    ) -> Result<()> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;
        analytics.total_reactions += 1;
        *analytics.reaction_breakdown.entry(kind).or_insert(0) += 1;

        if let Some(session) = sessions.get_mut(room_name).and_then(|s| s.get_mut(sender_id)) {
            session.reactions_sent += 1;
        }
        Ok(())
    }

    /// Track the peak bitrate and append to the bitrate timeline.
    pub fn bitrate_update(&self, room_name: &RoomId, bitrate: u32) -> Result<()> {
        let mut state = self.inner.write();
        let analytics = state
            .streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;

        if bitrate > analytics.peak_bitrate {
            analytics.peak_bitrate = bitrate;
        }
        analytics.bitrate_timeline.push(TimeSeriesPoint {
            timestamp: Utc::now(),
            value: f64::from(bitrate),
        });
        let max = self.config.max_timeline_points;
        if analytics.bitrate_timeline.len() > max {
            let excess = analytics.bitrate_timeline.len() - max;
            analytics.bitrate_timeline.drain(..excess);
        }
        Ok(())
    }

    /// Snapshot with freshly recomputed derived metrics.
    pub fn snapshot(&self, room_name: &RoomId) -> Result<StreamAnalytics> {
        let mut guard = self.inner.write();
        let AnalyticsState { streams, sessions } = &mut *guard;

        let analytics = streams
            .get_mut(room_name)
            .ok_or_else(|| Error::NotFound("analytics not found".to_string()))?;
        Self::recompute(analytics, sessions.get(room_name));
        Ok(analytics.clone())
    }

    pub fn viewer_sessions(&self, room_name: &RoomId) -> Vec<ViewerSession> {
        let state = self.inner.read();
        state
            .sessions
            .get(room_name)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop analytics records whose stream ended before the retention
    /// horizon, along with their session tables; returns the count.
    pub fn sweep_old(&self) -> usize {
        let cutoff = Utc::now() - ChronoDuration::days(self.config.retention_days);
        let mut state = self.inner.write();

        let old: Vec<RoomId> = state
            .streams
            .iter()
            .filter(|(_, a)| a.end_time.is_some_and(|e| e < cutoff))
            .map(|(room, _)| room.clone())
            .collect();

        for room in &old {
            state.streams.remove(room);
            state.sessions.remove(room);
        }

        if !old.is_empty() {
            info!(count = old.len(), "cleaned up old analytics");
        }
        old.len()
    }

    async fn sample_loop(self: Arc<Self>, room_name: RoomId) {
        let period = Duration::from_secs(self.config.update_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so samples are spaced
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut guard = self.inner.write();
            let AnalyticsState { streams, sessions } = &mut *guard;
            let Some(analytics) = streams.get_mut(&room_name) else {
                return;
            };
            if analytics.end_time.is_some() {
                return;
            }

            let now = Utc::now();
            analytics.viewer_timeline.push(TimeSeriesPoint {
                timestamp: now,
                value: analytics.current_viewers as f64,
            });
            analytics.chat_timeline.push(TimeSeriesPoint {
                timestamp: now,
                value: analytics.total_messages as f64,
            });
            analytics.reaction_timeline.push(TimeSeriesPoint {
                timestamp: now,
                value: analytics.total_reactions as f64,
            });

            let max = self.config.max_timeline_points;
            for timeline in [
                &mut analytics.viewer_timeline,
                &mut analytics.chat_timeline,
                &mut analytics.reaction_timeline,
            ] {
                if timeline.len() > max {
                    let excess = timeline.len() - max;
                    timeline.drain(..excess);
                }
            }

            Self::recompute(analytics, sessions.get(&room_name));
        }
    }

    fn recompute(
        analytics: &mut StreamAnalytics,
        sessions: Option<&HashMap<Identity, ViewerSession>>,
    ) {
        let Some(sessions) = sessions else {
            analytics.last_updated = Utc::now();
            return;
        };

        let mut total_watch = 0.0;
        let mut closed = 0u64;
        let mut messagers: HashSet<&Identity> = HashSet::new();

        for session in sessions.values() {
            if session.left_at.is_some() {
                total_watch += session.watch_secs;
                closed += 1;
            }
            if session.messages_sent > 0 {
                messagers.insert(&session.viewer_id);
            }
        }

        if closed > 0 {
            analytics.average_watch_secs = total_watch / closed as f64;
        }
        analytics.unique_messagers = messagers.len() as u64;

        if let Some(end) = analytics.end_time {
            let minutes = (end - analytics.start_time).num_milliseconds() as f64 / 60_000.0;
            if minutes > 0.0 {
                analytics.messages_per_minute = analytics.total_messages as f64 / minutes;
                analytics.reactions_per_minute = analytics.total_reactions as f64 / minutes;
            }
        }

        if analytics.total_viewers > 0 {
            analytics.viewer_retention = closed as f64 / analytics.total_viewers as f64 * 100.0;
        }

        analytics.last_updated = Utc::now();
    }
}
