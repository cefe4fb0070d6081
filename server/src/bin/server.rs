//! Ticket integrity HTTP server.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/ticket_integrity cargo run --bin server
//! STORAGE_BACKEND=memory cargo run --bin server
//! ```

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use ticket_integrity_core::environment::{Clock, SystemClock};
use ticket_integrity_server::telemetry::{DEFAULT_LOG_FILTER, init_tracing, start_metrics_exporter};
use ticket_integrity_server::{AppState, Config, MemoryStores, StorageBackend, build_router};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing(DEFAULT_LOG_FILTER);

    info!("Starting ticket integrity server");

    let config = Config::from_env();
    info!(
        backend = ?config.storage.backend,
        address = %config.bind_address(),
        "Configuration loaded"
    );

    if let Err(error) = start_metrics_exporter(SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port))) {
        warn!(%error, "Metrics exporter not started");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app: Router = match config.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .connect(&config.storage.database_url)
                .await
                .context("Failed to connect to database")?;
            ticket_integrity_postgres::migrate(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Database ready");
            build_router(AppState::postgres(pool, clock, &config.integrity))
        },
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            build_router(AppState::in_memory(MemoryStores::default(), clock, &config.integrity))
        },
    };

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully...");
}
