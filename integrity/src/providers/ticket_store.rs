//! Ticket storage with transactional read-modify-write.

use crate::error::Result;
use crate::types::{EventId, Ticket, TicketId, UserId};
use std::future::Future;

/// Outcome of a transaction body
///
/// `Keep` commits nothing; `Write` replaces the stored ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T> {
    /// Leave the ticket untouched and return `T`
    Keep(T),
    /// Persist `ticket` and return `outcome`
    Write {
        /// The updated ticket
        ticket: Ticket,
        /// Value returned once the write commits
        outcome: T,
    },
}

/// Ticket storage.
///
/// # Atomicity
///
/// [`TicketStore::transact`] must serialize transactions on the same ticket:
/// the body sees the state as of the start of its transaction, and no other
/// transaction on that ticket may commit between the read and the write. Two
/// concurrent check-ins of one ticket therefore cannot both observe
/// `checked_in == false`.
///
/// # Example
///
/// ```no_run
/// use ticket_integrity::providers::{TicketStore, Transition};
/// use ticket_integrity::types::TicketId;
///
/// # async fn example(store: impl TicketStore) -> ticket_integrity::error::Result<()> {
/// let admitted = store
///     .transact(&TicketId::new("abc123"), |ticket| match ticket {
///         Some(mut ticket) if !ticket.checked_in => {
///             ticket.checked_in = true;
///             Transition::Write { ticket, outcome: true }
///         }
///         _ => Transition::Keep(false),
///     })
///     .await?;
/// # let _ = admitted;
/// # Ok(())
/// # }
/// ```
pub trait TicketStore: Send + Sync {
    /// Read a ticket outside of any transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    fn get(&self, id: &TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send;

    /// Run `body` against the current ticket inside a transaction.
    ///
    /// `body` receives `None` when the ticket does not exist. It must not
    /// perform I/O; it only decides what to write.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction cannot be started or committed. A
    /// failed commit writes nothing.
    fn transact<T, F>(&self, id: &TicketId, body: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnOnce(Option<Ticket>) -> Transition<T> + Send;

    /// Count the tickets an attendee holds for an event that are pending or
    /// confirmed.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    fn count_active_for_attendee(
        &self,
        event_id: &EventId,
        attendee_id: &UserId,
    ) -> impl Future<Output = Result<u32>> + Send;
}
