//! Gate scanner control.
//!
//! A [`ScanController`] turns camera reads into at most one check-in at a
//! time, suppresses repeat reads of the same code, and shows each result for
//! a cooldown before scanning resumes.

mod controller;
mod handler;
mod parse;
mod reducer;

pub use controller::{ScanController, ScanReply, ScanStore};
pub use handler::EngineCheckInHandler;
pub use parse::{is_ticket_id, parse_ticket_id};
pub use reducer::{
    COOLDOWN, LastScan, ScanAction, ScanEnvironment, ScanOutcome, ScanPhase, ScanReducer, ScanState,
};
