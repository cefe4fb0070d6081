//! Sliding-window rate limit stage.

use super::{Denial, FraudStage, read_or_pass, window_start};
use crate::activity::ActivityLog;
use crate::config::FraudConfig;
use crate::providers::PurchaseLedger;
use crate::types::{ActivityType, PurchaseIntent, Severity, SuspiciousActivity};
use chrono::{DateTime, Utc};

const MESSAGE: &str = "Too many purchase attempts. Please wait a few minutes and try again.";

/// Denies when any scope has reached its limit within the window.
///
/// Scopes are checked per user (registered purchasers only), per IP address,
/// then per event and IP address.
pub(super) async fn check<L: PurchaseLedger>(
    ledger: &L,
    activity: &ActivityLog,
    config: &FraudConfig,
    intent: &PurchaseIntent,
    now: DateTime<Utc>,
) -> Option<Denial> {
    let since = window_start(now, config.rate_limit_window());

    let mut exceeded = None;
    if let Some(user_id) = &intent.user_id {
        let attempts = read_or_pass("rate_limit", ledger.count_for_user_since(user_id, since).await);
        if attempts >= config.max_attempts_per_user {
            exceeded = Some(("user", attempts, config.max_attempts_per_user));
        }
    }
    if exceeded.is_none() {
        let attempts = read_or_pass(
            "rate_limit",
            ledger.count_for_ip_since(&intent.ip_address, since).await,
        );
        if attempts >= config.max_attempts_per_ip {
            exceeded = Some(("ip", attempts, config.max_attempts_per_ip));
        }
    }
    if exceeded.is_none() {
        let attempts = read_or_pass(
            "rate_limit",
            ledger
                .count_for_event_ip_since(&intent.event_id, &intent.ip_address, since)
                .await,
        );
        if attempts >= config.max_attempts_per_event_ip {
            exceeded = Some(("event_ip", attempts, config.max_attempts_per_event_ip));
        }
    }

    let (scope, attempts, limit) = exceeded?;
    activity.log(SuspiciousActivity {
        user_id: intent.user_id.clone(),
        activity_type: ActivityType::RapidPurchases,
        severity: Severity::Medium,
        ip_address: intent.ip_address.clone(),
        metadata: serde_json::json!({
            "scope": scope,
            "attempts": attempts,
            "limit": limit,
            "window_secs": config.rate_limit_window_secs,
            "event_id": intent.event_id,
        }),
        detected_at: now,
    });
    Some(Denial::new(FraudStage::RateLimit, MESSAGE))
}
