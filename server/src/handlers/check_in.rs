//! Gate check-in endpoints.
//!
//! Both endpoints always answer `200` with a `CheckInResult`; a refused
//! ticket is a normal outcome, not an HTTP error.

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::{AppState, Backend};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use ticket_integrity::checkin::{CheckInRequest, CheckInResult};
use ticket_integrity::types::{EventId, TicketId};

/// Body of `POST /api/events/:event_id/check-ins`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInBody {
    /// Decoded ticket identifier
    pub ticket_id: String,
    /// Gate the attendee is entering through
    pub entry_point: String,
    /// Staff member operating the scanner
    pub scanned_by: String,
}

/// Body of `POST /api/events/:event_id/check-ins/override`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideBody {
    /// The check-in being overridden
    #[serde(flatten)]
    pub check_in: CheckInBody,
    /// Supervisor who approved the override
    pub authorized_by: String,
}

impl CheckInBody {
    fn into_request(self, event_id: String) -> Result<CheckInRequest, AppError> {
        let ticket_id = self.ticket_id.trim();
        if ticket_id.is_empty() {
            return Err(AppError::validation("ticket_id is required"));
        }
        if self.entry_point.trim().is_empty() || self.scanned_by.trim().is_empty() {
            return Err(AppError::validation("entry_point and scanned_by are required"));
        }

        Ok(CheckInRequest {
            ticket_id: TicketId::new(ticket_id),
            event_id: EventId::new(event_id),
            entry_point: self.entry_point,
            scanned_by: self.scanned_by,
        })
    }
}

/// Check a ticket in at a gate.
///
/// ```text
/// POST /api/events/:event_id/check-ins
/// {"ticket_id":"abc123","entry_point":"north-gate","scanned_by":"staff-7"}
/// ```
///
/// # Errors
///
/// Returns 422 if a field is blank.
pub async fn check_in<B: Backend>(
    State(state): State<AppState<B>>,
    correlation_id: CorrelationId,
    Path(event_id): Path<String>,
    Json(body): Json<CheckInBody>,
) -> Result<Json<CheckInResult>, AppError> {
    let request = body.into_request(event_id)?;
    tracing::debug!(
        correlation_id = %correlation_id.0,
        ticket_id = %request.ticket_id,
        "Check-in requested"
    );
    Ok(Json(state.check_in.check_in(&request).await))
}

/// Admit a ticket on a supervisor's authority.
///
/// ```text
/// POST /api/events/:event_id/check-ins/override
/// {"ticket_id":"abc123","entry_point":"north-gate","scanned_by":"staff-7","authorized_by":"sup-1"}
/// ```
///
/// # Errors
///
/// Returns 422 if a field is blank.
pub async fn override_check_in<B: Backend>(
    State(state): State<AppState<B>>,
    correlation_id: CorrelationId,
    Path(event_id): Path<String>,
    Json(body): Json<OverrideBody>,
) -> Result<Json<CheckInResult>, AppError> {
    let authorized_by = body.authorized_by.trim().to_string();
    if authorized_by.is_empty() {
        return Err(AppError::validation("authorized_by is required"));
    }
    let request = body.check_in.into_request(event_id)?;
    tracing::debug!(
        correlation_id = %correlation_id.0,
        ticket_id = %request.ticket_id,
        "Override requested"
    );
    Ok(Json(
        state
            .check_in
            .override_check_in(&request, &authorized_by)
            .await,
    ))
}
