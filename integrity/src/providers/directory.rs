//! Read-only lookups for attendee names and event settings.

use crate::error::Result;
use crate::types::{EventId, UserId};
use std::future::Future;

/// Resolves attendee display names for gate staff.
pub trait AttendeeDirectory: Send + Sync {
    /// Display name of an account, if it has one.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read.
    fn display_name(&self, user_id: &UserId) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Per-event policy settings.
pub trait EventPolicy: Send + Sync {
    /// Tickets one user may hold for the event; `None` means use the
    /// configured default.
    ///
    /// # Errors
    ///
    /// Returns error if the event cannot be read.
    fn max_tickets_per_user(
        &self,
        event_id: &EventId,
    ) -> impl Future<Output = Result<Option<u32>>> + Send;

    /// Whether admitted attendees may leave and come back in.
    ///
    /// # Errors
    ///
    /// Returns error if the event cannot be read.
    fn allow_reentry(&self, event_id: &EventId) -> impl Future<Output = Result<bool>> + Send;
}
