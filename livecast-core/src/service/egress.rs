//! Egress (encoder) client
//!
//! The external encoder composites a media-plane room into a file. It
//! exposes two RPCs: start a room-composite job and stop one. The trait
//! seam lets the recording coordinator run against a fake in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{config::EgressConfig, models::RoomId, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutput {
    pub file_type: String,
    pub filepath: String,
}

impl FileOutput {
    #[must_use]
    pub fn mp4(filepath: String) -> Self {
        Self {
            file_type: "mp4".to_string(),
            filepath,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressInfo {
    pub egress_id: String,
}

#[async_trait]
pub trait EgressClient: Send + Sync {
    /// Start compositing a room into the given outputs
    async fn start_room_composite(
        &self,
        room_name: &RoomId,
        layout: &str,
        outputs: &[FileOutput],
    ) -> Result<EgressInfo>;

    /// Stop a running egress job
    async fn stop(&self, egress_id: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    room_name: &'a str,
    layout: &'a str,
    audio_only: bool,
    file_outputs: &'a [FileOutput],
}

#[derive(Debug, Serialize)]
struct StopRequest<'a> {
    egress_id: &'a str,
}

/// HTTP implementation against the encoder service
pub struct HttpEgressClient {
    http: reqwest::Client,
    base_url: String,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl HttpEgressClient {
    #[must_use]
    pub fn new(config: &EgressConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            start_timeout: Duration::from_secs(config.start_timeout_secs),
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
        }
    }
}

#[async_trait]
impl EgressClient for HttpEgressClient {
    async fn start_room_composite(
        &self,
        room_name: &RoomId,
        layout: &str,
        outputs: &[FileOutput],
    ) -> Result<EgressInfo> {
        let url = format!("{}/egress/room_composite", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.start_timeout)
            .json(&StartRequest {
                room_name: room_name.as_str(),
                layout,
                audio_only: false,
                file_outputs: outputs,
            })
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("egress start failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "egress start failed with status {}",
                response.status()
            )));
        }

        response
            .json::<EgressInfo>()
            .await
            .map_err(|e| Error::Upstream(format!("egress start returned bad body: {e}")))
    }

    async fn stop(&self, egress_id: &str) -> Result<()> {
        let url = format!("{}/egress/stop", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.stop_timeout)
            .json(&StopRequest { egress_id })
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("egress stop failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "egress stop failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
