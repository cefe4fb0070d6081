//! Router configuration.

use crate::handlers::{activity, check_in, health, purchases};
use crate::middleware::correlation_id_layer;
use crate::state::{AppState, Backend};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// - `GET /health`, `GET /ready`
/// - `POST /api/events/:event_id/check-ins`
/// - `POST /api/events/:event_id/check-ins/override`
/// - `POST /api/purchases/screen`
/// - `POST /api/activity`
/// - `POST /api/blacklist`
pub fn build_router<B: Backend>(state: AppState<B>) -> Router {
    let api_routes = Router::new()
        .route("/events/:event_id/check-ins", post(check_in::check_in::<B>))
        .route(
            "/events/:event_id/check-ins/override",
            post(check_in::override_check_in::<B>),
        )
        .route("/purchases/screen", post(purchases::screen::<B>))
        .route("/activity", post(activity::report_activity::<B>))
        .route("/blacklist", post(activity::add_to_blacklist::<B>));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check::<B>))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
