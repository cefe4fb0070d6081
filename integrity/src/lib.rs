//! # Ticket Integrity
//!
//! Keeps ticketed events honest at both ends of a ticket's life:
//!
//! - [`fraud::FraudGuard`] screens purchases before payment: blacklist, rate
//!   limits, per-user caps and bot signals, denying fast with a generic
//!   message.
//! - [`checkin::CheckInEngine`] admits each ticket exactly once, even when
//!   several gates scan it at the same moment.
//! - [`scan::ScanController`] drives a gate scanner: it decodes camera reads,
//!   keeps one check-in in flight, suppresses repeat reads and shows each
//!   result for a short cooldown.
//!
//! Storage and notification are behind the traits in [`providers`]; the
//! `ticket-integrity-postgres` crate implements them on `PostgreSQL`, and
//! [`mocks`] implements them in memory.
//!
//! ## Example
//!
//! ```ignore
//! let engine = Arc::new(CheckInEngine::new(tickets, directory, policy, clock.clone(), config.check_in));
//! let handler = EngineCheckInHandler::new(engine, EventId::new("e-1"), "north-gate", "staff-1");
//! let scanner = ScanController::new(ScanEnvironment::new(clock, Arc::new(handler), config.scan));
//!
//! scanner.handle_scan("https://tix.example.com/tickets/abc123").await?;
//! ```

pub mod activity;
pub mod checkin;
pub mod config;
pub mod error;
pub mod fraud;
pub mod metrics;
pub mod mocks;
pub mod providers;
pub mod scan;
pub mod types;

pub use activity::{ActivityLog, TracingAlertHook};
pub use checkin::{CheckInEngine, CheckInRequest, CheckInResult, InvalidReason};
pub use config::{CheckInConfig, FraudConfig, IntegrityConfig, ScanConfig};
pub use error::{IntegrityError, ScanError};
pub use fraud::{FraudDecision, FraudGuard, FraudStage};
pub use scan::{ScanController, ScanPhase};
