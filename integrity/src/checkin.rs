//! Exactly-once ticket admission.
//!
//! [`CheckInEngine::check_in`] validates a ticket against the gate's event and
//! flips `checked_in` inside a single [`TicketStore::transact`] call. However
//! many scanners present the same ticket at once, exactly one of them gets
//! [`CheckInResult::Valid`]; the rest see [`CheckInResult::AlreadyCheckedIn`].
//!
//! Failures never reach gate staff as errors. A store failure is logged and
//! reported as `INVALID / NOT_FOUND`, so an unreadable ticket is never
//! admitted.

use crate::config::CheckInConfig;
use crate::metrics;
use crate::providers::{AttendeeDirectory, EventPolicy, TicketStore, Transition};
use crate::types::{EventId, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticket_integrity_core::environment::Clock;

/// Shown when a ticket has no holder account or the holder has no name.
pub const GUEST_NAME: &str = "Guest";

/// A check-in submitted by a gate scanner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRequest {
    /// Ticket presented at the gate
    pub ticket_id: TicketId,
    /// Event the gate is admitting to
    pub event_id: EventId,
    /// Gate or door name
    pub entry_point: String,
    /// Staff member operating the scanner
    pub scanned_by: String,
}

/// Why a ticket was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidReason {
    /// No such ticket, or the ticket could not be read
    NotFound,
    /// The ticket is for a different event
    WrongEvent,
    /// The ticket was refunded
    Refunded,
    /// The ticket was cancelled
    Cancelled,
    /// Payment has not completed
    PendingPayment,
}

/// Result of a check-in, as shown on the scanner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInResult {
    /// Admitted by this call
    Valid {
        /// Holder's display name
        attendee_name: String,
        /// Ticket tier
        ticket_type: String,
        /// Admissions covered by the ticket
        quantity: u32,
        /// Gate the ticket was admitted through
        entry_point: String,
    },
    /// Admitted earlier
    AlreadyCheckedIn {
        /// Holder's display name
        attendee_name: String,
        /// When the earlier admission happened
        checked_in_at: Option<DateTime<Utc>>,
        /// Gate of the earlier admission
        entry_point: Option<String>,
        /// Whether the event lets attendees back in
        allow_reentry: bool,
    },
    /// Refused
    Invalid {
        /// Why
        reason: InvalidReason,
    },
}

impl CheckInResult {
    /// Metric label for the result
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "valid",
            Self::AlreadyCheckedIn { .. } => "already_checked_in",
            Self::Invalid { .. } => "invalid",
        }
    }

    /// Whether this call admitted the ticket
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Decision taken inside the ticket transaction
enum Admission {
    Admitted(Ticket),
    AlreadyAdmitted(Ticket),
    Refused(InvalidReason),
}

/// Checks whether a ticket may be admitted to `event_id`.
///
/// Rejections are ordered: missing, wrong event, refunded, cancelled, pending.
fn validate(ticket: Option<Ticket>, event_id: &EventId) -> Result<Ticket, InvalidReason> {
    let ticket = ticket.ok_or(InvalidReason::NotFound)?;
    if &ticket.event_id != event_id {
        return Err(InvalidReason::WrongEvent);
    }
    match ticket.status {
        TicketStatus::Refunded => Err(InvalidReason::Refunded),
        TicketStatus::Cancelled => Err(InvalidReason::Cancelled),
        TicketStatus::Pending => Err(InvalidReason::PendingPayment),
        TicketStatus::Confirmed => Ok(ticket),
    }
}

/// Admits tickets at the gate.
pub struct CheckInEngine<T, D, P> {
    tickets: T,
    directory: D,
    policy: P,
    clock: Arc<dyn Clock>,
    config: CheckInConfig,
}

impl<T, D, P> CheckInEngine<T, D, P>
where
    T: TicketStore,
    D: AttendeeDirectory,
    P: EventPolicy,
{
    /// Create an engine over the given providers
    #[must_use]
    pub fn new(tickets: T, directory: D, policy: P, clock: Arc<dyn Clock>, config: CheckInConfig) -> Self {
        Self {
            tickets,
            directory,
            policy,
            clock,
            config,
        }
    }

    /// Validate and admit a ticket, exactly once.
    ///
    /// Never fails: storage errors are logged and reported as
    /// [`InvalidReason::NotFound`].
    #[tracing::instrument(
        skip(self, request),
        fields(ticket_id = %request.ticket_id, event_id = %request.event_id, entry_point = %request.entry_point)
    )]
    pub async fn check_in(&self, request: &CheckInRequest) -> CheckInResult {
        let now = self.clock.now();
        let event_id = request.event_id.clone();
        let scanned_by = request.scanned_by.clone();
        let entry_point = request.entry_point.clone();

        let admission = self
            .tickets
            .transact(&request.ticket_id, move |ticket| {
                let ticket = match validate(ticket, &event_id) {
                    Ok(ticket) => ticket,
                    Err(reason) => return Transition::Keep(Admission::Refused(reason)),
                };
                if ticket.checked_in {
                    return Transition::Keep(Admission::AlreadyAdmitted(ticket));
                }
                let mut admitted = ticket;
                admitted.record_admission(now, &scanned_by, &entry_point);
                Transition::Write {
                    ticket: admitted.clone(),
                    outcome: Admission::Admitted(admitted),
                }
            })
            .await;

        let result = match admission {
            Ok(Admission::Admitted(ticket)) => {
                tracing::info!(scanned_by = %request.scanned_by, "Ticket admitted");
                CheckInResult::Valid {
                    attendee_name: self.attendee_name(&ticket).await,
                    ticket_type: ticket.ticket_type,
                    quantity: ticket.quantity,
                    entry_point: request.entry_point.clone(),
                }
            },
            Ok(Admission::AlreadyAdmitted(ticket)) => {
                tracing::warn!(
                    first_entry_point = ticket.entry_point.as_deref().unwrap_or_default(),
                    "Ticket presented again after admission"
                );
                CheckInResult::AlreadyCheckedIn {
                    attendee_name: self.attendee_name(&ticket).await,
                    checked_in_at: ticket.checked_in_at,
                    entry_point: ticket.entry_point,
                    allow_reentry: self.allow_reentry(&request.event_id).await,
                }
            },
            Ok(Admission::Refused(reason)) => {
                tracing::info!(?reason, "Ticket refused");
                CheckInResult::Invalid { reason }
            },
            Err(error) => {
                tracing::error!(%error, "Check-in transaction failed");
                CheckInResult::Invalid {
                    reason: InvalidReason::NotFound,
                }
            },
        };

        metrics::record_check_in(result.outcome());
        result
    }

    /// Admit a ticket regardless of an earlier admission.
    ///
    /// The ticket must still be valid for the event: overrides lift the
    /// one-entry rule, not the status or event checks. The stored ticket is
    /// marked with `reentry_override`.
    #[tracing::instrument(
        skip(self, request),
        fields(ticket_id = %request.ticket_id, event_id = %request.event_id)
    )]
    pub async fn override_check_in(&self, request: &CheckInRequest, authorized_by: &str) -> CheckInResult {
        let now = self.clock.now();
        let event_id = request.event_id.clone();
        let scanned_by = request.scanned_by.clone();
        let entry_point = request.entry_point.clone();

        let admission = self
            .tickets
            .transact(&request.ticket_id, move |ticket| match validate(ticket, &event_id) {
                Ok(mut ticket) => {
                    ticket.record_admission(now, &scanned_by, &entry_point);
                    ticket.reentry_override = true;
                    Transition::Write {
                        ticket: ticket.clone(),
                        outcome: Ok(ticket),
                    }
                },
                Err(reason) => Transition::Keep(Err(reason)),
            })
            .await;

        let result = match admission {
            Ok(Ok(ticket)) => {
                tracing::warn!(
                    scanned_by = %request.scanned_by,
                    authorized_by,
                    "Ticket admitted by override"
                );
                metrics::record_override();
                CheckInResult::Valid {
                    attendee_name: self.attendee_name(&ticket).await,
                    ticket_type: ticket.ticket_type,
                    quantity: ticket.quantity,
                    entry_point: request.entry_point.clone(),
                }
            },
            Ok(Err(reason)) => {
                tracing::info!(?reason, "Override refused");
                CheckInResult::Invalid { reason }
            },
            Err(error) => {
                tracing::error!(%error, "Override transaction failed");
                CheckInResult::Invalid {
                    reason: InvalidReason::NotFound,
                }
            },
        };

        metrics::record_check_in(result.outcome());
        result
    }

    async fn attendee_name(&self, ticket: &Ticket) -> String {
        let Some(attendee_id) = &ticket.attendee_id else {
            return GUEST_NAME.to_string();
        };
        match self.directory.display_name(attendee_id).await {
            Ok(Some(name)) => name,
            Ok(None) => GUEST_NAME.to_string(),
            Err(error) => {
                tracing::warn!(%error, attendee_id = %attendee_id, "Attendee lookup failed");
                GUEST_NAME.to_string()
            },
        }
    }

    async fn allow_reentry(&self, event_id: &EventId) -> bool {
        match self.policy.allow_reentry(event_id).await {
            Ok(allowed) => allowed,
            Err(error) => {
                tracing::warn!(%error, "Event policy lookup failed, using default re-entry setting");
                self.config.default_allow_reentry
            },
        }
    }
}
