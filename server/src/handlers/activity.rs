//! Operator endpoints: activity reports and blacklist entries.

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::state::{AppState, Backend};
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticket_integrity::types::{
    ActivityType, BlacklistEntry, BlacklistKind, Severity, SuspiciousActivity, UserId,
};
use ticket_integrity_core::environment::Clock as _;

/// Body of `POST /api/activity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Account involved, if known
    #[serde(default)]
    pub user_id: Option<String>,
    /// What was observed
    pub activity_type: ActivityType,
    /// How serious it is; `critical` pages operators
    pub severity: Severity,
    /// Address involved; the reporter's address when absent
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Record suspicious activity reported by another service or an operator.
///
/// Answers `202 Accepted`; the record is written in the background.
#[allow(clippy::unused_async)]
pub async fn report_activity<B: Backend>(
    State(state): State<AppState<B>>,
    ClientIp(client_ip): ClientIp,
    Json(report): Json<ActivityReport>,
) -> StatusCode {
    let metadata = if report.metadata.is_null() {
        serde_json::json!({})
    } else {
        report.metadata
    };

    state.fraud.report_activity(SuspiciousActivity {
        user_id: report.user_id.map(UserId::new),
        activity_type: report.activity_type,
        severity: report.severity,
        ip_address: report.ip_address.unwrap_or_else(|| client_ip.to_string()),
        metadata,
        detected_at: state.clock.now(),
    });

    StatusCode::ACCEPTED
}

/// Body of `POST /api/blacklist`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistBody {
    /// What is being blocked
    pub kind: BlacklistKind,
    /// User id, IP address or email
    pub value: String,
    /// Why, for operators
    pub reason: String,
    /// When the block lapses; never when absent
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Block a user, IP address or email.
///
/// # Errors
///
/// Returns 422 for a blank value and 5xx if the blacklist cannot be written.
pub async fn add_to_blacklist<B: Backend>(
    State(state): State<AppState<B>>,
    Json(body): Json<BlacklistBody>,
) -> Result<StatusCode, AppError> {
    let value = body.value.trim();
    if value.is_empty() {
        return Err(AppError::validation("value is required"));
    }

    state
        .fraud
        .add_to_blacklist(BlacklistEntry {
            kind: body.kind,
            value: value.to_string(),
            reason: body.reason,
            expires_at: body.expires_at,
        })
        .await?;

    Ok(StatusCode::CREATED)
}
