//! shopfloor-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing.
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the scheduling engine.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use shopfloor_scheduler::api::{self, AppState};
use shopfloor_scheduler::config::Config;
use shopfloor_scheduler::engine::SchedulingEngine;
use shopfloor_scheduler::logging::init_logging;
use shopfloor_scheduler::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_logging(&cfg.log_level, cfg.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "shopfloor-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url, cfg.db_max_connections).await?;
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. Scheduling engine ───────────────────────────────────────────────────
    info!(
        horizon_minutes = cfg.engine.horizon_minutes,
        time_limit_ms = cfg.engine.solve_time_limit.map(|d| d.as_millis() as u64),
        respect_committed = cfg.engine.respect_committed,
        "engine configured"
    );
    let engine = SchedulingEngine::new(store, cfg.engine.clone());
    let state = Arc::new(AppState::new(engine));

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = api::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shopfloor-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
