//! Tracing and Prometheus setup for the binaries.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,ticket_integrity=debug,sqlx=warn";

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, falling back to `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Errors that can occur while starting the metrics exporter
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install the exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Serve Prometheus metrics on `addr` and describe the integrity metrics.
///
/// # Errors
///
/// Returns error if a recorder is already installed or the listener cannot
/// start.
pub fn start_metrics_exporter(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    ticket_integrity::metrics::register_metrics();
    tracing::info!(%addr, "Prometheus metrics available at http://{addr}/metrics");
    Ok(())
}
