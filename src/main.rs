//! CloudBox server entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use cloudbox_api::{build_app, build_state};
use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::types::{Clock, SystemClock};
use cloudbox_database::connection::DatabasePool;
use cloudbox_database::store::Stores;
use cloudbox_service::ShareSweeper;

#[tokio::main]
async fn main() {
    let env = std::env::var("CLOUDBOX_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, &env).await {
        tracing::error!(error = %e, "Server terminated with error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, env: &str) -> Result<(), AppError> {
    tracing::info!(env = %env, "Starting CloudBox v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_placeholder_secret() {
        tracing::warn!("Using the placeholder JWT secret; set CLOUDBOX__AUTH__JWT_SECRET");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Persistence ──────────────────────────────────────────────
    let (stores, db) = if config.database.is_configured() {
        let db = DatabasePool::connect(&config.database).await?;
        cloudbox_database::migration::run_migrations(db.pool()).await?;
        (Stores::postgres(db.pool().clone()), Some(db))
    } else {
        tracing::warn!("No database URL configured; using in-memory stores");
        (Stores::in_memory(), None)
    };

    // ── Object storage ───────────────────────────────────────────
    let storage = cloudbox_storage::build_object_storage(
        &config.storage,
        &config.auth.jwt_secret,
        Arc::clone(&clock),
    )
    .await?;

    // ── Shutdown channel & share sweeper ─────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_handle = if config.share.sweep_interval_seconds > 0 {
        let sweeper = ShareSweeper::new(
            Arc::clone(&stores.shares),
            Arc::clone(&clock),
            Duration::from_secs(config.share.sweep_interval_seconds),
        );
        Some(sweeper.spawn(shutdown_rx.clone()))
    } else {
        tracing::info!("Share sweeper disabled");
        None
    };

    // ── HTTP server ──────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_app(build_state(config, &stores, storage, clock));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("CloudBox server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(handle) = sweeper_handle {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Share sweeper did not stop within the grace period");
        }
    }
    if let Some(db) = db {
        db.close().await;
    }

    tracing::info!("CloudBox server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
