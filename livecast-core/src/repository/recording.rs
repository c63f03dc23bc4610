//! Recording projection
//!
//! Mirrors the in-memory VOD catalog into the contracted `recordings`
//! table. The catalog stays authoritative; rows here are an eventually
//! consistent projection written on status transitions.

use chrono::Utc;
use sqlx::{AnyPool, Row};

use crate::{models::VodRecording, Result};

pub struct RecordingStore {
    pool: AnyPool,
}

/// A projected catalog row. Only the contracted columns survive the round
/// trip; live-only fields (view counts, metadata) stay in memory.
#[derive(Debug, Clone)]
pub struct RecordingRow {
    pub id: String,
    pub room_name: String,
    pub streamer_id: String,
    pub streamer_name: String,
    pub title: String,
    pub status: String,
    pub video_path: String,
    pub thumbnail_path: String,
    pub duration: f64,
    pub file_size: i64,
}

impl RecordingStore {
    #[must_use]
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Insert or update a recording row from the catalog entry.
    pub async fn upsert(&self, recording: &VodRecording) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"INSERT INTO recordings (
                id, room_name, streamer_id, streamer_name, title, status,
                video_path, thumbnail_path, duration, file_size, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(id) DO UPDATE SET
                title = EXCLUDED.title,
                status = EXCLUDED.status,
                video_path = EXCLUDED.video_path,
                thumbnail_path = EXCLUDED.thumbnail_path,
                duration = EXCLUDED.duration,
                file_size = EXCLUDED.file_size,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&recording.id)
        .bind(recording.room_name.as_str())
        .bind(recording.streamer_id.as_str())
        .bind(&recording.streamer_name)
        .bind(&recording.title)
        .bind(recording.status.as_str())
        .bind(&recording.video_url)
        .bind(&recording.thumbnail_url)
        .bind(recording.duration_secs)
        .bind(recording.file_size)
        .bind(recording.recorded_at.to_rfc3339())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<RecordingRow>> {
        let row = sqlx::query(
            r"SELECT id, room_name, streamer_id, streamer_name, title, status,
                     video_path, thumbnail_path, duration, file_size
              FROM recordings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| decode_row(&r)).transpose()
    }

    pub async fn list(&self, limit: i64) -> Result<Vec<RecordingRow>> {
        let rows = sqlx::query(
            r"SELECT id, room_name, streamer_id, streamer_name, title, status,
                     video_path, thumbnail_path, duration, file_size
              FROM recordings ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &sqlx::any::AnyRow) -> Result<RecordingRow> {
    Ok(RecordingRow {
        id: row.try_get("id")?,
        room_name: row.try_get("room_name")?,
        streamer_id: row.try_get("streamer_id")?,
        streamer_name: row.try_get("streamer_name")?,
        title: row.try_get("title")?,
        status: row.try_get("status")?,
        video_path: row.try_get("video_path")?,
        thumbnail_path: row.try_get("thumbnail_path")?,
        duration: row.try_get("duration")?,
        file_size: row.try_get("file_size")?,
    })
}
