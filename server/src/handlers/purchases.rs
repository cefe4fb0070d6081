//! Purchase screening endpoint.

use crate::error::AppError;
use crate::extractors::{ClientIp, CorrelationId};
use crate::state::{AppState, Backend};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use ticket_integrity::fraud::FraudDecision;
use ticket_integrity::types::{EventId, PurchaseIntent, UserId};

/// Body of `POST /api/purchases/screen`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenBody {
    /// Purchaser's account; absent for guest checkout
    #[serde(default)]
    pub user_id: Option<String>,
    /// Purchaser's email
    #[serde(default)]
    pub email: Option<String>,
    /// Purchaser's address; taken from the request when absent
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Event being purchased
    pub event_id: String,
    /// Tickets requested
    pub quantity: u32,
    /// Browser or device fingerprint
    #[serde(default)]
    pub fingerprint: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Screen a purchase before payment.
///
/// Answers `200` with a `FraudDecision` whether or not the purchase is
/// allowed.
///
/// # Errors
///
/// Returns 422 if `event_id` is blank or `quantity` is zero.
pub async fn screen<B: Backend>(
    State(state): State<AppState<B>>,
    correlation_id: CorrelationId,
    ClientIp(client_ip): ClientIp,
    Json(body): Json<ScreenBody>,
) -> Result<Json<FraudDecision>, AppError> {
    if body.event_id.trim().is_empty() {
        return Err(AppError::validation("event_id is required"));
    }
    if body.quantity == 0 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let intent = PurchaseIntent {
        user_id: non_blank(body.user_id).map(UserId::new),
        email: non_blank(body.email),
        ip_address: non_blank(body.ip_address).unwrap_or_else(|| client_ip.to_string()),
        event_id: EventId::new(body.event_id.trim()),
        quantity: body.quantity,
        fingerprint: non_blank(body.fingerprint),
    };

    tracing::debug!(correlation_id = %correlation_id.0, event_id = %intent.event_id, "Screening purchase");
    Ok(Json(state.fraud.screen(&intent).await))
}
