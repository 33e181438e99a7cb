//! # Teamboard API Server
//!
//! Team task-board service: accounts, boards, team tasks, direct messages and
//! realtime room updates over WebSocket.
//!
//! ## Storage
//!
//! With `DATABASE_URL` set, requests are served from PostgreSQL whenever it is
//! reachable and from process memory while it is not. Without it, everything
//! lives in memory and is lost on exit.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p teamboard-api
//! ```

use std::{sync::Arc, time::Duration};
use teamboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use teamboard_shared::{
    db::pool::{close_pool, create_lazy_pool, DatabaseConfig},
    realtime::RealtimeHub,
    store::{PgStore, Storage},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teamboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Teamboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let storage = match config.database.persistent_url() {
        Some(url) => {
            let pool = create_lazy_pool(&DatabaseConfig {
                max_connections: config.database.max_connections,
                ..DatabaseConfig::new(url)
            })?;
            Storage::with_persistent(PgStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured; all data is volatile");
            Storage::volatile()
        }
    };
    let storage = Arc::new(storage);

    let backing = storage.probe().await;
    tracing::info!(backing = %backing, "Storage ready");

    let monitor = storage.clone().spawn_health_monitor(Duration::from_secs(
        config.database.health_interval_secs.max(1),
    ));

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let addr = config.bind_address();
    let state = AppState::new(storage.clone(), Arc::new(RealtimeHub::new()), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(monitor) = monitor {
        monitor.abort();
    }
    if let Some(pg) = storage.persistent() {
        close_pool(pg.pool()).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
