//! Blacklist stage.

use super::{Denial, FraudStage, read_or_pass};
use crate::activity::ActivityLog;
use crate::providers::Blacklist;
use crate::types::{ActivityType, BlacklistKind, PurchaseIntent, Severity, SuspiciousActivity};
use chrono::{DateTime, Utc};

pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const fn message(kind: BlacklistKind) -> &'static str {
    match kind {
        BlacklistKind::User => "Your account is not permitted to purchase tickets.",
        BlacklistKind::Ip => "Purchases from your network are temporarily unavailable.",
        BlacklistKind::Email => "We were unable to process this purchase. Please contact support.",
    }
}

/// Denies when the user, email or IP address has an active entry.
pub(super) async fn check<B: Blacklist>(
    blacklist: &B,
    activity: &ActivityLog,
    intent: &PurchaseIntent,
    now: DateTime<Utc>,
) -> Option<Denial> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(user_id) = &intent.user_id {
        candidates.push((BlacklistKind::User, user_id.as_str().to_string()));
    }
    if let Some(email) = &intent.email {
        candidates.push((BlacklistKind::Email, normalize_email(email)));
    }
    candidates.push((BlacklistKind::Ip, intent.ip_address.clone()));

    for (kind, value) in candidates {
        let entry = read_or_pass("blacklist", blacklist.find_active(kind, &value, now).await);
        if let Some(entry) = entry {
            activity.log(SuspiciousActivity {
                user_id: intent.user_id.clone(),
                activity_type: ActivityType::Blacklisted,
                severity: Severity::Medium,
                ip_address: intent.ip_address.clone(),
                metadata: serde_json::json!({
                    "blacklist_type": kind.as_str(),
                    "reason": entry.reason,
                    "event_id": intent.event_id,
                }),
                detected_at: now,
            });
            return Some(Denial::new(FraudStage::Blacklist, message(kind)));
        }
    }
    None
}
