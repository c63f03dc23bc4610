//! Live-stream registry
//!
//! Process-wide discovery listing of what is currently live. Entries are
//! upserted by id by the streamer's client and removed when the stream
//! ends; the discovery page snapshots the whole set.

use dashmap::DashMap;
use tracing::debug;

use crate::models::StreamRegistryEntry;

#[derive(Default)]
pub struct StreamRegistry {
    streams: DashMap<String, StreamRegistryEntry>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an entry by id.
    pub fn register(&self, entry: StreamRegistryEntry) {
        debug!(stream_id = entry.id, "stream registered");
        self.streams.insert(entry.id.clone(), entry);
    }

    pub fn unregister(&self, id: &str) {
        debug!(stream_id = id, "stream unregistered");
        self.streams.remove(id);
    }

    #[must_use]
    pub fn list(&self) -> Vec<StreamRegistryEntry> {
        self.streams.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, viewers: u64) -> StreamRegistryEntry {
        StreamRegistryEntry {
            id: id.to_string(),
            title: "t".to_string(),
            streamer: "s".to_string(),
            avatar: String::new(),
            viewers,
            start_time: 0,
        }
    }

    #[test]
    fn test_register_is_upsert() {
        let registry = StreamRegistry::new();
        registry.register(entry("s1", 1));
        registry.register(entry("s1", 42));

        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].viewers, 42);
    }

    #[test]
    fn test_unregister() {
        let registry = StreamRegistry::new();
        registry.register(entry("s1", 1));
        registry.unregister("s1");
        assert!(registry.list().is_empty());
        // Unregistering a missing id is a no-op
        registry.unregister("s1");
    }
}
