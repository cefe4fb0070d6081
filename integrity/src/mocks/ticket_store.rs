//! In-memory ticket store.

use crate::error::{IntegrityError, Result};
use crate::providers::{TicketStore, Transition};
use crate::types::{EventId, Ticket, TicketId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-memory ticket store.
///
/// Transactions hold the store lock from read to write and yield to the
/// scheduler in between, so concurrent check-ins genuinely interleave at
/// the await point while still being serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<Mutex<HashMap<TicketId, Ticket>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ticket.
    pub async fn insert(&self, ticket: Ticket) {
        self.tickets.lock().await.insert(ticket.id.clone(), ticket);
    }

    /// Current copy of a ticket.
    pub async fn get_ticket(&self, id: &str) -> Option<Ticket> {
        self.tickets.lock().await.get(&TicketId::new(id)).cloned()
    }

    /// Make every operation fail with [`IntegrityError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IntegrityError::Unavailable);
        }
        Ok(())
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn get(&self, id: &TicketId) -> Result<Option<Ticket>> {
        self.ensure_available()?;
        Ok(self.tickets.lock().await.get(id).cloned())
    }

    async fn transact<T, F>(&self, id: &TicketId, body: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Option<Ticket>) -> Transition<T> + Send,
    {
        self.ensure_available()?;
        let mut tickets = self.tickets.lock().await;
        let current = tickets.get(id).cloned();
        tokio::task::yield_now().await;

        match body(current) {
            Transition::Keep(outcome) => Ok(outcome),
            Transition::Write { ticket, outcome } => {
                tickets.insert(ticket.id.clone(), ticket);
                Ok(outcome)
            },
        }
    }

    async fn count_active_for_attendee(&self, event_id: &EventId, attendee_id: &UserId) -> Result<u32> {
        self.ensure_available()?;
        let tickets = self.tickets.lock().await;
        let count = tickets
            .values()
            .filter(|ticket| {
                &ticket.event_id == event_id
                    && ticket.attendee_id.as_ref() == Some(attendee_id)
                    && ticket.status.counts_toward_cap()
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
