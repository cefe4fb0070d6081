//! Result cards for the gate scanner console.

use std::time::Duration;
use ticket_integrity::checkin::CheckInResult;
use ticket_integrity::scan::ScanReply;
use ticket_integrity_runtime::StoreError;

/// HTTP timeout for one check-in call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the console waits for a submitted scan.
///
/// Longer than [`CALL_TIMEOUT`] so a slow call comes back as a failed check-in.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Line printed when the scanner gave up waiting.
pub const NO_RESPONSE: &str = "!! Check-in failed: no response from the check-in service";

/// Render the outcome of a submitted scan.
///
/// A check-in that timed out is shown to the operator like any other failed
/// call; the console keeps scanning.
///
/// # Errors
///
/// Returns the store error when the scanner itself is unusable (shut down or
/// its channel closed).
pub fn render_reply(reply: Result<ScanReply, StoreError>) -> Result<String, StoreError> {
    match reply {
        Ok(ScanReply::Ignored) => Ok("(ignored)".to_string()),
        Ok(ScanReply::Completed(outcome)) => Ok(card(outcome.ticket_id.as_str(), &outcome.result)),
        Ok(ScanReply::Failed(error)) => Ok(format!("!! Check-in failed: {error}")),
        Err(StoreError::Timeout) => Ok(NO_RESPONSE.to_string()),
        Err(error) => Err(error),
    }
}

/// One-line card for a check-in result.
#[must_use]
pub fn card(ticket_id: &str, result: &CheckInResult) -> String {
    match result {
        CheckInResult::Valid {
            attendee_name,
            ticket_type,
            quantity,
            ..
        } => format!("[VALID] {ticket_id}: {attendee_name}, {ticket_type} x{quantity}"),
        CheckInResult::AlreadyCheckedIn {
            attendee_name,
            checked_in_at,
            entry_point,
            allow_reentry,
        } => {
            let when = checked_in_at.map_or_else(|| "unknown time".to_string(), |at| at.to_rfc3339());
            let gate = entry_point.as_deref().unwrap_or("unknown gate");
            let reentry = if *allow_reentry { "re-entry allowed" } else { "no re-entry" };
            format!("[ALREADY CHECKED IN] {ticket_id}: {attendee_name}, at {when} via {gate} ({reentry})")
        },
        CheckInResult::Invalid { reason } => format!("[INVALID] {ticket_id}: {reason:?}"),
    }
}
