//! Provider traits for the storage and notification seams.
//!
//! Engines are generic over these traits so that the gate can run against
//! `PostgreSQL` in production and the in-memory [`crate::mocks`] in tests.

mod audit;
mod blacklist;
mod check_in_handler;
mod directory;
mod ledger;
mod ticket_store;

pub use audit::{AlertHook, AuditSink};
pub use blacklist::Blacklist;
pub use check_in_handler::CheckInHandler;
pub use directory::{AttendeeDirectory, EventPolicy};
pub use ledger::PurchaseLedger;
pub use ticket_store::{TicketStore, Transition};
