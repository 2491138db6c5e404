//! Market Feed Hub — Entry Point
//!
//! Initializes configuration, logging, the feed manager and the ops
//! endpoints. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build FeedManager (one supervisor per enabled exchange,
//!    startup symbols subscribed from config)
//! 4. Start all feed supervisors (auto-reconnect WebSockets)
//! 5. Spawn ops server (/live + /ready + /metrics)
//! 6. Wait for SIGINT → graceful shutdown (unready→stop→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

use market_feed_hub::config;
use market_feed_hub::usecases::FeedManager;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        binance = config.exchanges.binance.enabled,
        bybit = config.exchanges.bybit.enabled,
        kraken = config.exchanges.kraken.enabled,
        "Starting market feed hub"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (ready_tx, ready_rx) = watch::channel(true);

    // ── 4. Build and start the feed manager ─────────────────
    let manager = Arc::new(
        FeedManager::from_config(&config).context("Failed to build feed manager")?,
    );
    manager.start();

    // ── 5. Spawn ops server (/live, /ready, /metrics) ───────
    let ops_handle = if config.metrics.enabled {
        let bind_address = config.metrics.bind_address.clone();
        let ops_manager = Arc::clone(&manager);
        let ops_shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) =
                serve_ops(bind_address, ops_manager, ready_rx, ops_shutdown).await
            {
                error!(error = %e, "ops server failed");
            }
        }))
    } else {
        None
    };

    info!("All tasks spawned — service is running");

    // ── 6. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown: unready → stop feeds → exit ──────

    // 1. Mark unready (readiness probe → 503)
    let _ = ready_tx.send(false);

    // 2. Stop all supervisors and join within the grace period
    manager.stop().await;

    // 3. Stop the ops server
    let _ = shutdown_tx.send(());
    if let Some(handle) = ops_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Serve health and metrics endpoints.
///
/// - `/live`    — Liveness probe: 200 while the process runs
/// - `/ready`   — Readiness probe: 503 during graceful shutdown
/// - `/metrics` — Prometheus text exposition
async fn serve_ops(
    bind_address: String,
    manager: Arc<FeedManager>,
    ready_rx: watch::Receiver<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let health = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(
                move |State(rx): State<watch::Receiver<bool>>| async move {
                    if *rx.borrow() {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                },
            ),
        )
        .with_state(ready_rx);

    let metrics = Router::new()
        .route(
            "/metrics",
            get(|State(m): State<Arc<FeedManager>>| async move {
                m.metrics().render()
            }),
        )
        .with_state(manager);

    let app = health.merge(metrics);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Ops server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}
