//! Recording coordinator
//!
//! Binds VOD catalog entries to external encoder jobs and reconciles their
//! lifecycles: recording -> processing -> ready -> (archived | deleted).
//! Also owns playback sessions with the watch-completion heuristic.
//!
//! The in-memory catalog is authoritative; a configured store receives
//! best-effort projections of every status transition.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    config::VodConfig,
    models::{Identity, PlaybackSession, RoomId, VodRecording, VodStatus, EGRESS_ID_KEY},
    repository::RecordingStore,
    service::egress::{EgressClient, FileOutput},
    Error, Result,
};

/// Layout the encoder uses when compositing the room
const COMPOSITE_LAYOUT: &str = "grid-light";

#[derive(Default)]
struct VodState {
    recordings: HashMap<String, VodRecording>,
    /// streamer -> recording ids in creation order
    by_streamer: HashMap<Identity, Vec<String>>,
    sessions: HashMap<String, PlaybackSession>,
}

pub struct VodCoordinator {
    inner: RwLock<VodState>,
    egress: Arc<dyn EgressClient>,
    store: Option<Arc<RecordingStore>>,
    config: VodConfig,
}

impl VodCoordinator {
    #[must_use]
    pub fn new(
        egress: Arc<dyn EgressClient>,
        store: Option<Arc<RecordingStore>>,
        config: VodConfig,
    ) -> Self {
        Self {
            inner: RwLock::new(VodState::default()),
            egress,
            store,
            config,
        }
    }

    /// Begin recording a room.
    ///
    /// Reserves the catalog entry, then asks the encoder to composite the
    /// room into `<storage_root>/<id>.mp4`. If the encoder refuses, the
    /// reservation is rolled back and the call fails. No lock is held
    /// across the encoder call.
    pub async fn start(
        &self,
        room_name: RoomId,
        streamer_id: Identity,
        streamer_name: String,
        title: String,
    ) -> Result<(VodRecording, String)> {
        let now = Utc::now();
        let recording_id = format!(
            "rec-{}-{}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            streamer_id
        );

        let recording = VodRecording {
            id: recording_id.clone(),
            room_name: room_name.clone(),
            streamer_id: streamer_id.clone(),
            streamer_name,
            title,
            description: String::new(),
            thumbnail_url: String::new(),
            video_url: String::new(),
            file_size: 0,
            duration_secs: 0.0,
            status: VodStatus::Recording,
            view_count: 0,
            recorded_at: now,
            published_at: None,
            expires_at: (self.config.retention_days > 0)
                .then(|| now + ChronoDuration::days(self.config.retention_days)),
            is_public: self.config.auto_publish,
            tags: Vec::new(),
            category: String::new(),
            metadata: HashMap::new(),
            average_watch_secs: 0.0,
            peak_viewers: 0,
        };

        {
            let mut state = self.inner.write();
            state.recordings.insert(recording_id.clone(), recording);
            state
                .by_streamer
                .entry(streamer_id.clone())
                .or_default()
                .push(recording_id.clone());
        }

        let filepath = format!(
            "{}/{}.mp4",
            self.config.storage_root.trim_end_matches('/'),
            recording_id
        );
        let outputs = [FileOutput::mp4(filepath)];

        let egress_info = match self
            .egress
            .start_room_composite(&room_name, COMPOSITE_LAYOUT, &outputs)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                // Roll back the reservation; the record never existed
                let mut state = self.inner.write();
                state.recordings.remove(&recording_id);
                if let Some(ids) = state.by_streamer.get_mut(&streamer_id) {
                    ids.retain(|id| id != &recording_id);
                }
                return Err(Error::Upstream(format!("failed to start egress: {e}")));
            }
        };

        let recording = {
            let mut state = self.inner.write();
            let rec = state
                .recordings
                .get_mut(&recording_id)
                .ok_or_else(|| Error::Internal("recording vanished during start".to_string()))?;
            rec.metadata
                .insert(EGRESS_ID_KEY.to_string(), egress_info.egress_id.clone());
            rec.clone()
        };

        info!(
            recording_id,
            room_name = %room_name,
            streamer_id = %streamer_id,
            egress_id = egress_info.egress_id,
            "started VOD recording"
        );

        self.project(&recording);
        Ok((recording, egress_info.egress_id))
    }

    /// Stop an active recording and hand it to post-processing.
    ///
    /// A caller-supplied `egress_id` must name the job bound to the
    /// recording. The encoder stop and the processing delay run on a
    /// background task; an encoder stop failure is logged and swallowed so
    /// the record still transitions.
    pub fn stop(
        self: &Arc<Self>,
        recording_id: &str,
        egress_id: Option<&str>,
        duration_secs: f64,
        file_size: i64,
    ) -> Result<()> {
        let (egress_id, recording) = {
            let mut state = self.inner.write();
            let rec = state
                .recordings
                .get_mut(recording_id)
                .ok_or_else(|| Error::NotFound("recording not found".to_string()))?;

            if rec.status != VodStatus::Recording {
                return Err(Error::Conflict(
                    "recording is not in recording status".to_string(),
                ));
            }

            let bound = rec.metadata.get(EGRESS_ID_KEY).cloned();
            if let (Some(provided), Some(bound)) = (egress_id, bound.as_deref()) {
                if provided != bound {
                    return Err(Error::InvalidInput(
                        "egress_id does not match the job bound to this recording".to_string(),
                    ));
                }
            }

            rec.duration_secs = duration_secs;
            rec.file_size = file_size;
            rec.status = VodStatus::Processing;
            (bound, rec.clone())
        };

        info!(recording_id, duration_secs, file_size, "stopped VOD recording");
        self.project(&recording);

        let coordinator = Arc::clone(self);
        let recording_id = recording_id.to_string();
        tokio::spawn(async move {
            coordinator.post_process(recording_id, egress_id).await;
        });

        Ok(())
    }

    async fn post_process(&self, recording_id: String, egress_id: Option<String>) {
        if let Some(egress_id) = egress_id {
            // Record consistency wins over encoder reachability
            if let Err(e) = self.egress.stop(&egress_id).await {
                warn!(recording_id, egress_id, error = %e, "failed to stop egress");
            }
        }

        info!(recording_id, "processing VOD recording");
        tokio::time::sleep(Duration::from_secs(self.config.processing_delay_secs)).await;

        let recording = {
            let mut state = self.inner.write();
            let Some(rec) = state.recordings.get_mut(&recording_id) else {
                return;
            };
            if rec.status != VodStatus::Processing {
                return;
            }

            if self.config.generate_thumbnails {
                rec.thumbnail_url = format!("/thumbnails/{recording_id}.jpg");
            }
            rec.video_url = format!("/videos/{recording_id}.mp4");
            rec.status = VodStatus::Ready;
            if self.config.auto_publish {
                rec.is_public = true;
                rec.published_at = Some(Utc::now());
            }
            rec.clone()
        };

        info!(
            recording_id,
            video_url = recording.video_url,
            "VOD recording ready"
        );
        self.project(&recording);
    }

    /// Make a ready recording publicly available.
    pub fn publish(&self, recording_id: &str) -> Result<VodRecording> {
        let recording = {
            let mut state = self.inner.write();
            let rec = state
                .recordings
                .get_mut(recording_id)
                .ok_or_else(|| Error::NotFound("recording not found".to_string()))?;

            if rec.status != VodStatus::Ready {
                return Err(Error::Conflict("recording is not ready".to_string()));
            }

            rec.is_public = true;
            rec.published_at = Some(Utc::now());
            rec.clone()
        };

        info!(recording_id, "published VOD recording");
        self.project(&recording);
        Ok(recording)
    }

    pub fn get(&self, recording_id: &str) -> Result<VodRecording> {
        self.inner
            .read()
            .recordings
            .get(recording_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("recording not found".to_string()))
    }

    /// A streamer's recordings, newest first.
    #[must_use]
    pub fn list_by_streamer(
        &self,
        streamer_id: &Identity,
        limit: usize,
        offset: usize,
    ) -> Vec<VodRecording> {
        let state = self.inner.read();
        state
            .by_streamer
            .get(streamer_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .skip(offset)
                    .take(limit)
                    .filter_map(|id| state.recordings.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every recording, newest first.
    #[must_use]
    pub fn list_all(&self, limit: usize, offset: usize) -> Vec<VodRecording> {
        let state = self.inner.read();
        let mut all: Vec<VodRecording> = state.recordings.values().cloned().collect();
        all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        all.into_iter().skip(offset).take(limit).collect()
    }

    pub fn update_metadata(
        &self,
        recording_id: &str,
        title: Option<String>,
        description: Option<String>,
        tags: Option<Vec<String>>,
        category: Option<String>,
    ) -> Result<()> {
        let mut state = self.inner.write();
        let rec = state
            .recordings
            .get_mut(recording_id)
            .ok_or_else(|| Error::NotFound("recording not found".to_string()))?;

        if let Some(title) = title {
            rec.title = title;
        }
        if let Some(description) = description {
            rec.description = description;
        }
        if let Some(tags) = tags {
            rec.tags = tags;
        }
        if let Some(category) = category {
            rec.category = category;
        }
        Ok(())
    }

    /// Remove a recording from the catalog. Terminal.
    pub fn delete(&self, recording_id: &str) -> Result<()> {
        let recording = {
            let mut state = self.inner.write();
            let mut rec = state
                .recordings
                .remove(recording_id)
                .ok_or_else(|| Error::NotFound("recording not found".to_string()))?;
            rec.status = VodStatus::Deleted;

            if let Some(ids) = state.by_streamer.get_mut(&rec.streamer_id) {
                ids.retain(|id| id != recording_id);
            }
            rec
        };

        info!(recording_id, "deleted VOD recording");
        self.project(&recording);
        Ok(())
    }

    /// Start a playback session on a ready, public recording.
    pub fn start_playback(
        &self,
        recording_id: &str,
        user_id: Identity,
        quality: String,
    ) -> Result<PlaybackSession> {
        let mut state = self.inner.write();
        let rec = state
            .recordings
            .get_mut(recording_id)
            .ok_or_else(|| Error::NotFound("recording not found".to_string()))?;

        if rec.status != VodStatus::Ready {
            return Err(Error::Conflict(
                "recording is not ready for playback".to_string(),
            ));
        }
        if !rec.is_public {
            return Err(Error::Authorization("recording is not public".to_string()));
        }

        rec.view_count += 1;

        let now = Utc::now();
        let session = PlaybackSession {
            id: format!(
                "session-{}-{}",
                now.timestamp_nanos_opt().unwrap_or_default(),
                user_id
            ),
            recording_id: recording_id.to_string(),
            user_id,
            started_at: now,
            last_heartbeat: now,
            position_secs: 0.0,
            watch_secs: 0.0,
            completed: false,
            quality,
        };
        state.sessions.insert(session.id.clone(), session.clone());

        debug!(
            session_id = session.id,
            recording_id, "started playback session"
        );
        Ok(session)
    }

    /// Refresh a session's heartbeat and position. `completed` latches true
    /// once the position crosses the completion threshold and never resets.
    pub fn heartbeat(&self, session_id: &str, position_secs: f64) -> Result<PlaybackSession> {
        let mut guard = self.inner.write();
        let VodState {
            recordings,
            sessions,
            ..
        } = &mut *guard;

        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound("session not found".to_string()))?;

        let now = Utc::now();
        session.last_heartbeat = now;
        session.position_secs = position_secs;
        session.watch_secs = (now - session.started_at).num_milliseconds() as f64 / 1000.0;

        if let Some(rec) = recordings.get(&session.recording_id) {
            if rec.duration_secs > 0.0
                && position_secs >= rec.duration_secs * self.config.completion_threshold
            {
                session.completed = true;
            }
        }

        Ok(session.clone())
    }

    /// End a session, folding its watch time into the recording's running
    /// mean weighted by view count.
    pub fn end_playback(&self, session_id: &str) -> Result<PlaybackSession> {
        let mut guard = self.inner.write();
        let VodState {
            recordings,
            sessions,
            ..
        } = &mut *guard;

        let session = sessions
            .remove(session_id)
            .ok_or_else(|| Error::NotFound("session not found".to_string()))?;

        if let Some(rec) = recordings.get_mut(&session.recording_id) {
            if rec.view_count > 0 {
                let prior = rec.average_watch_secs * (rec.view_count - 1) as f64;
                rec.average_watch_secs = (prior + session.watch_secs) / rec.view_count as f64;
            }
        }

        debug!(
            session_id,
            watch_secs = session.watch_secs,
            completed = session.completed,
            "ended playback session"
        );
        Ok(session)
    }

    /// Remove recordings whose expiry has passed; returns the count.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = Vec::new();
        {
            let mut state = self.inner.write();
            let expired: Vec<String> = state
                .recordings
                .iter()
                .filter(|(_, r)| r.expires_at.is_some_and(|e| now > e))
                .map(|(id, _)| id.clone())
                .collect();

            for id in expired {
                if let Some(mut rec) = state.recordings.remove(&id) {
                    rec.status = VodStatus::Deleted;
                    if let Some(ids) = state.by_streamer.get_mut(&rec.streamer_id) {
                        ids.retain(|i| i != &id);
                    }
                    removed.push(rec);
                }
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "cleaned up expired recordings");
        }
        for rec in &removed {
            self.project(rec);
        }
        removed.len()
    }

    /// Remove playback sessions without a recent heartbeat; returns the count.
    pub fn sweep_stale_sessions(&self) -> usize {
        let timeout = ChronoDuration::seconds(self.config.session_timeout_secs as i64);
        let now = Utc::now();

        let mut state = self.inner.write();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| now - s.last_heartbeat <= timeout);
        let swept = before - state.sessions.len();

        if swept > 0 {
            debug!(count = swept, "cleaned up stale playback sessions");
        }
        swept
    }

    /// Mirror a catalog entry into the persistent store, if one is
    /// configured. Best-effort: failures are logged, never surfaced.
    fn project(&self, recording: &VodRecording) {
        if let Some(store) = &self.store {
            let store = Arc::clone(store);
            let recording = recording.clone();
            tokio::spawn(async move {
                if let Err(e) = store.upsert(&recording).await {
                    warn!(recording_id = recording.id, error = %e, "failed to project recording");
                }
            });
        }
    }
}
