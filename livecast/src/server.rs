use std::time::Duration;
use tracing::{debug, info};

use livecast_api::{create_router, AppState};
use livecast_core::Config;

/// The assembled server: HTTP surface plus background maintenance loops.
pub struct LivecastServer {
    config: Config,
    state: AppState,
}

impl LivecastServer {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn start(self) -> anyhow::Result<()> {
        self.spawn_sweepers();

        let addr = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("HTTP server listening on {addr}");

        let router = create_router(self.state);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }

    /// One maintenance loop per concern; each runs the engine's sweep
    /// under its own lock scope.
    fn spawn_sweepers(&self) {
        let intervals = &self.config.maintenance;

        let keys = self.state.keys.clone();
        spawn_sweeper("stream_keys", intervals.key_sweep_interval_secs, move || {
            keys.sweep_expired()
        });

        let reactions = self.state.reactions.clone();
        spawn_sweeper(
            "reactions",
            intervals.reaction_sweep_interval_secs,
            move || reactions.sweep_expired(),
        );

        let vod = self.state.vod.clone();
        spawn_sweeper("vod", intervals.vod_sweep_interval_secs, move || {
            vod.sweep_expired() + vod.sweep_stale_sessions()
        });

        let analytics = self.state.analytics.clone();
        spawn_sweeper(
            "analytics",
            intervals.analytics_sweep_interval_secs,
            move || analytics.sweep_old(),
        );

        let notifications = self.state.notifications.clone();
        spawn_sweeper(
            "notifications",
            intervals.notification_sweep_interval_secs,
            move || notifications.sweep_expired(),
        );
    }
}

fn spawn_sweeper(
    name: &'static str,
    interval_secs: u64,
    sweep: impl Fn() -> usize + Send + Sync + 'static,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick is immediate; nothing to sweep yet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let swept = sweep();
            if swept > 0 {
                debug!(task = name, swept, "maintenance sweep");
            }
        }
    });
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("exit requested, shutting down");
}
