//! The scanner's check-in callback.

use crate::checkin::CheckInResult;
use crate::error::ScanError;
use crate::types::TicketId;
use futures::future::BoxFuture;

/// Performs a check-in on behalf of a gate scanner.
///
/// The scanner runs the returned future as a detached effect, so it must not
/// borrow from `self`.
pub trait CheckInHandler: Send + Sync {
    /// Check a ticket in at this scanner's gate.
    fn check_in(&self, ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>>;
}
