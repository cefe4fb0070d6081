//! HTTP API and gate scanner client for ticket integrity.
//!
//! # Architecture
//!
//! ```text
//! scanner (stdin) ──HTTP──► axum router
//!                             /api/events/:id/check-ins   → CheckInEngine
//!                             /api/purchases/screen       → FraudGuard
//!                             /api/activity, /api/blacklist
//!                                   │
//!                                   ▼
//!                        PostgreSQL or in-memory providers
//! ```
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::postgres(pool, Arc::new(SystemClock), &config.integrity);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use client::HttpCheckInHandler;
pub use config::{Config, StorageBackend};
pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use routes::build_router;
pub use state::{AppState, Backend, MemoryBackend, MemoryStores, PostgresBackend};
