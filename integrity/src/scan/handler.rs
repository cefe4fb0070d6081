//! Check-in callback backed by an in-process [`CheckInEngine`].

use crate::checkin::{CheckInEngine, CheckInRequest, CheckInResult};
use crate::error::ScanError;
use crate::providers::{AttendeeDirectory, CheckInHandler, EventPolicy, TicketStore};
use crate::types::{EventId, TicketId};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Checks tickets in directly against an engine, for scanners running in
/// the same process as the ticket store.
pub struct EngineCheckInHandler<T, D, P> {
    engine: Arc<CheckInEngine<T, D, P>>,
    event_id: EventId,
    entry_point: String,
    scanned_by: String,
}

impl<T, D, P> EngineCheckInHandler<T, D, P> {
    /// A handler for one gate of one event
    #[must_use]
    pub fn new(
        engine: Arc<CheckInEngine<T, D, P>>,
        event_id: EventId,
        entry_point: impl Into<String>,
        scanned_by: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            event_id,
            entry_point: entry_point.into(),
            scanned_by: scanned_by.into(),
        }
    }
}

impl<T, D, P> CheckInHandler for EngineCheckInHandler<T, D, P>
where
    T: TicketStore + 'static,
    D: AttendeeDirectory + 'static,
    P: EventPolicy + 'static,
{
    fn check_in(&self, ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
        let engine = Arc::clone(&self.engine);
        let request = CheckInRequest {
            ticket_id,
            event_id: self.event_id.clone(),
            entry_point: self.entry_point.clone(),
            scanned_by: self.scanned_by.clone(),
        };
        Box::pin(async move { Ok(engine.check_in(&request).await) })
    }
}
