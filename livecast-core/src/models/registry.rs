use serde::{Deserialize, Serialize};

/// Public "what's live" listing entry, upserted by id.
///
/// Field names match the discovery page wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRegistryEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub streamer: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub viewers: u64,
    #[serde(rename = "startTime", default)]
    pub start_time: i64,
}
