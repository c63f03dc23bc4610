use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub signer: SignerConfig,
    pub chat: ChatConfig,
    pub reactions: ReactionConfig,
    pub vod: VodConfig,
    pub analytics: AnalyticsConfig,
    pub notifications: NotificationConfig,
    pub egress: EgressConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 7880,
        }
    }
}

/// Token signer configuration
///
/// `api_key` / `api_secret` form the credential pair the media plane also
/// knows; grants signed here are verified there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Media-plane URL returned alongside issued grants
    pub media_url: String,
    pub token_ttl_hours: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            api_key: "devkey".to_string(),
            api_secret: "secret".to_string(),
            media_url: "ws://localhost:7880".to_string(),
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Capacity of the chat fan-out channel
    pub channel_capacity: usize,
    /// Words masked by the bad-word filter
    pub bad_words: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            bad_words: vec![
                "spam".to_string(),
                "scam".to_string(),
                "badword1".to_string(),
                "badword2".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    pub max_per_minute: u32,
    pub max_per_second: u32,
    pub ttl_secs: u64,
    pub enable_rate_limit: bool,
    pub enable_leaderboard: bool,
    pub max_recent: usize,
    pub channel_capacity: usize,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            max_per_minute: 60,
            max_per_second: 3,
            ttl_secs: 300,
            enable_rate_limit: true,
            enable_leaderboard: true,
            max_recent: 100,
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VodConfig {
    /// Root directory the encoder writes finished files into
    pub storage_root: String,
    /// Days until a recording becomes eligible for sweep (0 disables expiry)
    pub retention_days: i64,
    pub auto_publish: bool,
    pub generate_thumbnails: bool,
    /// Playback sessions without a heartbeat for this long are swept
    pub session_timeout_secs: u64,
    /// Simulated post-processing delay between stop and ready
    pub processing_delay_secs: u64,
    /// Fraction of the duration a viewer must cross to count as completed
    pub completion_threshold: f64,
}

impl Default for VodConfig {
    fn default() -> Self {
        Self {
            storage_root: "/out".to_string(),
            retention_days: 30,
            auto_publish: false,
            generate_thumbnails: true,
            session_timeout_secs: 300,
            processing_delay_secs: 5,
            completion_threshold: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub update_interval_secs: u64,
    pub max_timeline_points: usize,
    pub retention_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 10,
            max_timeline_points: 1000,
            retention_days: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub max_per_user: usize,
    pub ttl_days: i64,
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_per_user: 1000,
            ttl_days: 30,
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EgressConfig {
    /// Base URL of the external encoder service
    pub base_url: String,
    pub start_timeout_secs: u64,
    pub stop_timeout_secs: u64,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            start_timeout_secs: 10,
            stop_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL for the persistence projection. Empty means
    /// `DATABASE_URL` from the environment, then the SQLite fallback.
    pub url: String,
    /// Local SQLite file used when no URL is reachable
    pub fallback_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            fallback_path: "data/livecast.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub key_sweep_interval_secs: u64,
    pub reaction_sweep_interval_secs: u64,
    pub vod_sweep_interval_secs: u64,
    pub analytics_sweep_interval_secs: u64,
    pub notification_sweep_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            key_sweep_interval_secs: 300,
            reaction_sweep_interval_secs: 60,
            vod_sweep_interval_secs: 300,
            analytics_sweep_interval_secs: 3600,
            notification_sweep_interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (LIVECAST_SERVER_HOST, etc.)
        builder = builder.add_source(
            Environment::with_prefix("LIVECAST")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get the HTTP bind address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.http_port, 7880);
        assert_eq!(config.signer.token_ttl_hours, 24);
        assert_eq!(config.reactions.max_per_second, 3);
        assert_eq!(config.reactions.max_per_minute, 60);
        assert!((config.vod.completion_threshold - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                http_port: 7880,
            },
            ..Config::default()
        };
        assert_eq!(config.http_address(), "127.0.0.1:7880");
    }
}
