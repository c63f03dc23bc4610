mod server;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use livecast_api::AppState;
use livecast_core::{
    logging,
    repository::{self, RecordingStore},
    service::{
        AnalyticsEngine, ChatEngine, ContentFilter, HttpEgressClient, NotificationFabric,
        ReactionEngine, StreamKeyService, StreamRegistry, TokenService, VodCoordinator,
    },
    Config,
};

use server::LivecastServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (optional file path as the first argument)
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("livecast server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Persistent store (optional projection; the server runs without it)
    let store = repository::connect(&config.database.url, &config.database.fallback_path)
        .await
        .map(|pool| Arc::new(RecordingStore::new(pool)));
    if store.is_none() {
        info!("running without a persistent store");
    }

    // 4. Wire the engines
    let tokens = Arc::new(TokenService::new(
        config.signer.api_key.clone(),
        config.signer.api_secret.clone(),
        config.signer.media_url.clone(),
        Duration::from_secs(config.signer.token_ttl_hours * 3600),
    ));
    let keys = Arc::new(StreamKeyService::new());
    let chat = Arc::new(ChatEngine::new(
        ContentFilter::with_words(config.chat.bad_words.clone()),
        config.chat.channel_capacity,
    ));
    let reactions = Arc::new(ReactionEngine::new(config.reactions.clone()));
    let egress = Arc::new(HttpEgressClient::new(&config.egress));
    let vod = Arc::new(VodCoordinator::new(egress, store, config.vod.clone()));
    let analytics = Arc::new(AnalyticsEngine::new(config.analytics.clone()));
    let notifications = Arc::new(NotificationFabric::new(config.notifications.clone()));
    let registry = Arc::new(StreamRegistry::new());

    let state = AppState {
        tokens,
        keys,
        chat,
        reactions,
        vod,
        analytics,
        notifications,
        registry,
    };

    // 5. Serve
    let server = LivecastServer::new(config, state);
    server.start().await
}
