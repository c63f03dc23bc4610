//! Stream key management
//!
//! Long-lived opaque credentials for streamers: generation, validation,
//! usage accounting, revocation, and expiry sweeping.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    models::{Identity, RoomId, StreamKey, StreamPermissions},
    Error, Result,
};

/// A key counts toward the active-stream total if it was used this recently
const LIVENESS_WINDOW_SECS: i64 = 300;

#[derive(Default)]
struct KeyTable {
    keys: HashMap<String, StreamKey>,
    /// streamer -> keys, for listing without a full scan
    by_streamer: HashMap<Identity, Vec<String>>,
}

/// Manages stream keys for all streamers
pub struct StreamKeyService {
    table: RwLock<KeyTable>,
}

impl Default for StreamKeyService {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamKeyService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(KeyTable::default()),
        }
    }

    /// Generate a new stream key: 32 random bytes, hex-encoded.
    pub fn generate(
        &self,
        streamer_id: Identity,
        room_name: RoomId,
        permissions: Option<StreamPermissions>,
        expires_in: Option<Duration>,
    ) -> Result<StreamKey> {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let key = hex::encode(key_bytes);

        let now = Utc::now();
        let stream_key = StreamKey {
            key: key.clone(),
            streamer_id: streamer_id.clone(),
            room_name,
            is_active: true,
            created_at: now,
            expires_at: expires_in.map(|d| {
                now + ChronoDuration::from_std(d).unwrap_or_else(|_| ChronoDuration::zero())
            }),
            metadata: HashMap::new(),
            usage_count: 0,
            last_used_at: None,
            permissions: permissions.unwrap_or_default(),
        };

        let mut table = self.table.write();
        table.keys.insert(key.clone(), stream_key.clone());
        table.by_streamer.entry(streamer_id.clone()).or_default().push(key.clone());

        info!(
            streamer_id = %streamer_id,
            key_prefix = &key[..8],
            "generated new stream key"
        );

        Ok(stream_key)
    }

    /// Validate a key: it must exist, be active, and not be expired.
    pub fn validate(&self, key: &str) -> Result<StreamKey> {
        let table = self.table.read();
        let stream_key = table
            .keys
            .get(key)
            .ok_or_else(|| Error::NotFound("stream key not found".to_string()))?;

        if !stream_key.is_active {
            return Err(Error::Authentication("stream key is inactive".to_string()));
        }

        if let Some(expires_at) = stream_key.expires_at {
            if Utc::now() > expires_at {
                return Err(Error::Authentication("stream key has expired".to_string()));
            }
        }

        Ok(stream_key.clone())
    }

    /// Record one use of the key: bumps the counter and last-used stamp.
    /// Returns the updated key.
    pub fn mark_used(&self, key: &str) -> Result<StreamKey> {
        let mut table = self.table.write();
        let stream_key = table
            .keys
            .get_mut(key)
            .ok_or_else(|| Error::NotFound("stream key not found".to_string()))?;

        stream_key.usage_count += 1;
        stream_key.last_used_at = Some(Utc::now());

        debug!(
            key_prefix = &key[..8.min(key.len())],
            usage_count = stream_key.usage_count,
            "stream key used"
        );

        Ok(stream_key.clone())
    }

    /// Deactivate a key. The entry is retained for audit until swept.
    pub fn revoke(&self, key: &str) -> Result<()> {
        let mut table = self.table.write();
        let stream_key = table
            .keys
            .get_mut(key)
            .ok_or_else(|| Error::NotFound("stream key not found".to_string()))?;

        stream_key.is_active = false;

        info!(
            key_prefix = &key[..8.min(key.len())],
            streamer_id = %stream_key.streamer_id,
            "stream key revoked"
        );

        Ok(())
    }

    /// Physically remove a key and its streamer-index entry.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut table = self.table.write();
        let stream_key = table
            .keys
            .remove(key)
            .ok_or_else(|| Error::NotFound("stream key not found".to_string()))?;

        if let Some(keys) = table.by_streamer.get_mut(&stream_key.streamer_id) {
            keys.retain(|k| k != key);
        }

        info!(
            key_prefix = &key[..8.min(key.len())],
            streamer_id = %stream_key.streamer_id,
            "stream key deleted"
        );

        Ok(())
    }

    /// Merge string metadata into a key.
    pub fn update_metadata(&self, key: &str, metadata: HashMap<String, String>) -> Result<()> {
        let mut table = self.table.write();
        let stream_key = table
            .keys
            .get_mut(key)
            .ok_or_else(|| Error::NotFound("stream key not found".to_string()))?;

        stream_key.metadata.extend(metadata);
        Ok(())
    }

    /// All keys a streamer holds. An unknown streamer has none.
    #[must_use]
    pub fn list_by_streamer(&self, streamer_id: &Identity) -> Vec<StreamKey> {
        let table = self.table.read();
        table
            .by_streamer
            .get(streamer_id)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| table.keys.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every key whose expiry lies in the past; returns the count.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut table = self.table.write();

        let expired: Vec<String> = table
            .keys
            .iter()
            .filter(|(_, k)| k.expires_at.is_some_and(|e| now > e))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(stream_key) = table.keys.remove(key) {
                if let Some(keys) = table.by_streamer.get_mut(&stream_key.streamer_id) {
                    keys.retain(|k| k != key);
                }
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "cleaned up expired stream keys");
        }

        expired.len()
    }

    /// Number of active keys used within the liveness window. This is the
    /// "currently streaming" heuristic, not a count of valid keys.
    #[must_use]
    pub fn count_active(&self) -> usize {
        let now = Utc::now();
        let table = self.table.read();
        table
            .keys
            .values()
            .filter(|k| {
                k.is_active
                    && k.last_used_at
                        .is_some_and(|used| now - used < ChronoDuration::seconds(LIVENESS_WINDOW_SECS))
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_shape() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(Identity::from("alice"), RoomId::from("r1"), None, None)
            .unwrap();
        assert_eq!(key.key.len(), 64);
        assert!(key.key.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(key.is_active);
        assert_eq!(key.usage_count, 0);
    }

    #[test]
    fn test_validate_and_mark_used() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(
                Identity::from("alice"),
                RoomId::from("r1"),
                None,
                Some(Duration::from_secs(3600)),
            )
            .unwrap();

        let validated = svc.validate(&key.key).unwrap();
        assert_eq!(validated.streamer_id.as_str(), "alice");

        svc.mark_used(&key.key).unwrap();
        let listed = svc.list_by_streamer(&Identity::from("alice"));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].usage_count, 1);
        assert!(listed[0].last_used_at.is_some());
    }

    #[test]
    fn test_revoke_is_absorbing() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(Identity::from("alice"), RoomId::from("r1"), None, None)
            .unwrap();

        svc.revoke(&key.key).unwrap();
        assert!(matches!(
            svc.validate(&key.key),
            Err(Error::Authentication(_))
        ));
        // Still revoked on a second look
        assert!(matches!(
            svc.validate(&key.key),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_expired_key_fails_validation() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(
                Identity::from("alice"),
                RoomId::from("r1"),
                None,
                Some(Duration::from_secs(0)),
            )
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(matches!(
            svc.validate(&key.key),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let svc = StreamKeyService::new();
        assert!(matches!(svc.validate("nope"), Err(Error::NotFound(_))));
        assert!(matches!(svc.mark_used("nope"), Err(Error::NotFound(_))));
        assert!(matches!(svc.revoke("nope"), Err(Error::NotFound(_))));
        assert!(matches!(svc.delete("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            svc.update_metadata("nope", HashMap::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_metadata_merges() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(Identity::from("alice"), RoomId::from("r1"), None, None)
            .unwrap();

        let mut meta = HashMap::new();
        meta.insert("label".to_string(), "main".to_string());
        svc.update_metadata(&key.key, meta).unwrap();

        let mut meta = HashMap::new();
        meta.insert("encoder".to_string(), "obs".to_string());
        svc.update_metadata(&key.key, meta).unwrap();

        let validated = svc.validate(&key.key).unwrap();
        assert_eq!(validated.metadata["label"], "main");
        assert_eq!(validated.metadata["encoder"], "obs");
    }

    #[test]
    fn test_delete_cleans_streamer_index() {
        let svc = StreamKeyService::new();
        let streamer = Identity::from("alice");
        let key = svc
            .generate(streamer.clone(), RoomId::from("r1"), None, None)
            .unwrap();

        svc.delete(&key.key).unwrap();
        assert!(svc.list_by_streamer(&streamer).is_empty());
        assert!(matches!(svc.validate(&key.key), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_sweep_expired() {
        let svc = StreamKeyService::new();
        svc.generate(
            Identity::from("alice"),
            RoomId::from("r1"),
            None,
            Some(Duration::from_secs(0)),
        )
        .unwrap();
        svc.generate(Identity::from("alice"), RoomId::from("r1"), None, None)
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(svc.sweep_expired(), 1);
        assert_eq!(svc.list_by_streamer(&Identity::from("alice")).len(), 1);
    }

    #[test]
    fn test_count_active_requires_recent_use() {
        let svc = StreamKeyService::new();
        let key = svc
            .generate(Identity::from("alice"), RoomId::from("r1"), None, None)
            .unwrap();

        // Never used: not live
        assert_eq!(svc.count_active(), 0);

        svc.mark_used(&key.key).unwrap();
        assert_eq!(svc.count_active(), 1);

        svc.revoke(&key.key).unwrap();
        assert_eq!(svc.count_active(), 0);
    }
}
