//! Bot detection stage.

use super::{Denial, FraudStage, read_or_pass, window_start};
use crate::activity::ActivityLog;
use crate::config::{FraudConfig, MIN_FINGERPRINT_IP_THRESHOLD};
use crate::providers::PurchaseLedger;
use crate::types::{ActivityType, PurchaseIntent, Severity, SuspiciousActivity};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

const MESSAGE: &str = "We were unable to process this purchase. Please try again later.";

/// Denies on either automation signal within the bot window:
///
/// - the device fingerprint has been used from too many distinct IP
///   addresses, counting the current one
/// - the user's most recent attempts are spaced closer than a human could
///   manage on average
pub(super) async fn check<L: PurchaseLedger>(
    ledger: &L,
    activity: &ActivityLog,
    config: &FraudConfig,
    intent: &PurchaseIntent,
    now: DateTime<Utc>,
) -> Option<Denial> {
    let since = window_start(now, config.bot_window());

    if let Some(fingerprint) = &intent.fingerprint {
        let mut ips: BTreeSet<String> = read_or_pass(
            "bot_detection",
            ledger.distinct_ips_for_fingerprint_since(fingerprint, since).await,
        )
        .into_iter()
        .collect();
        ips.insert(intent.ip_address.clone());

        if ips.len() >= config.fingerprint_ip_threshold.max(MIN_FINGERPRINT_IP_THRESHOLD) {
            activity.log(SuspiciousActivity {
                user_id: intent.user_id.clone(),
                activity_type: ActivityType::BotBehavior,
                severity: Severity::High,
                ip_address: intent.ip_address.clone(),
                metadata: serde_json::json!({
                    "signal": "fingerprint_ip_fan_out",
                    "fingerprint": fingerprint,
                    "distinct_ips": ips.len(),
                    "event_id": intent.event_id,
                }),
                detected_at: now,
            });
            return Some(Denial::new(FraudStage::BotDetection, MESSAGE));
        }
    }

    let user_id = intent.user_id.as_ref()?;
    let sample = config.interval_sample_size;
    if sample < 2 {
        return None;
    }
    let times = read_or_pass(
        "bot_detection",
        ledger
            .recent_attempt_times_for_user(user_id, since, sample)
            .await,
    );
    if times.len() < sample {
        return None;
    }

    let intervals: Vec<i64> = times
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_milliseconds().abs())
        .collect();
    let count = i64::try_from(intervals.len()).unwrap_or(i64::MAX);
    let mean = intervals.iter().sum::<i64>() / count;
    if mean >= config.min_mean_interval_ms {
        return None;
    }

    activity.log(SuspiciousActivity {
        user_id: Some(user_id.clone()),
        activity_type: ActivityType::BotBehavior,
        severity: Severity::High,
        ip_address: intent.ip_address.clone(),
        metadata: serde_json::json!({
            "signal": "rapid_interval",
            "mean_interval_ms": mean,
            "intervals_ms": intervals,
            "event_id": intent.event_id,
        }),
        detected_at: now,
    });
    Some(Denial::new(FraudStage::BotDetection, MESSAGE))
}
