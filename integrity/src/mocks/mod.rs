//! In-memory provider implementations.
//!
//! Used by the unit and integration tests, and by the server's `memory`
//! storage backend for local development. Every mock is cheaply cloneable;
//! clones share the same data, so a test can keep a handle for inspection.

mod audit;
mod blacklist;
mod directory;
mod ledger;
mod ticket_store;

pub use audit::{RecordingAlertHook, RecordingAuditSink};
pub use blacklist::InMemoryBlacklist;
pub use directory::{InMemoryAttendeeDirectory, InMemoryEventPolicy};
pub use ledger::InMemoryPurchaseLedger;
pub use ticket_store::InMemoryTicketStore;
