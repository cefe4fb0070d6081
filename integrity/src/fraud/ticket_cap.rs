//! Per-user ticket cap stage.

use super::{Denial, FraudStage};
use crate::config::FraudConfig;
use crate::metrics;
use crate::providers::{EventPolicy, TicketStore};
use crate::types::PurchaseIntent;

/// Returns the user's remaining allowance, or a denial when the request
/// would exceed the event's cap.
///
/// Guests have no allowance to check. Pending and confirmed tickets count
/// toward the cap.
pub(super) async fn check<T: TicketStore, P: EventPolicy>(
    tickets: &T,
    policy: &P,
    config: &FraudConfig,
    intent: &PurchaseIntent,
) -> Result<Option<u32>, Denial> {
    let Some(user_id) = &intent.user_id else {
        return Ok(None);
    };

    let cap = match policy.max_tickets_per_user(&intent.event_id).await {
        Ok(Some(cap)) => cap,
        Ok(None) => config.default_max_tickets_per_user,
        Err(error) => {
            tracing::warn!(%error, "Event cap unavailable, using default");
            config.default_max_tickets_per_user
        },
    };

    let held = match tickets
        .count_active_for_attendee(&intent.event_id, user_id)
        .await
    {
        Ok(held) => held,
        Err(error) => {
            tracing::warn!(%error, check = "ticket_cap", "Fraud check data unavailable, failing open");
            metrics::record_fail_open("ticket_cap");
            return Ok(None);
        },
    };

    if held >= cap {
        return Err(Denial::new(
            FraudStage::TicketCap,
            format!("You have reached the limit of {cap} tickets for this event (0 remaining)."),
        ));
    }

    let remaining = cap - held;
    if intent.quantity > remaining {
        return Err(Denial::new(
            FraudStage::TicketCap,
            format!("You can buy at most {remaining} more ticket(s) for this event ({remaining} remaining)."),
        ));
    }

    Ok(Some(remaining))
}
