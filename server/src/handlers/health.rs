//! Health check endpoints.
//!
//! Used by load balancers and orchestrators to verify service health.

use crate::state::{AppState, Backend};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness check.
///
/// Returns 200 OK while the process is serving requests. Does not touch
/// storage.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Storage backend answered
    pub database: bool,
}

/// Readiness check.
///
/// Pings the database when the server runs on `PostgreSQL`; in-memory
/// storage is always ready.
///
/// # Status Codes
///
/// - 200 OK: ready for traffic
/// - 503 Service Unavailable: the database did not answer
pub async fn readiness_check<B: Backend>(
    State(state): State<AppState<B>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match &state.database {
        Some(pool) => match ticket_integrity_postgres::ping(pool).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "Readiness check failed");
                false
            },
        },
        None => true,
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }
}
