//! Suspicious-activity logging.
//!
//! [`ActivityLog`] is the single entry point for audit records: it counts the
//! record, hands it to the [`AuditSink`] and raises an operator alert for
//! critical severity. None of this can fail from the caller's point of view.

use crate::metrics;
use crate::providers::{AlertHook, AuditSink};
use crate::types::{Severity, SuspiciousActivity, UserId};
use std::sync::Arc;

/// Alert hook that reports critical activity through the error log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertHook;

impl AlertHook for TracingAlertHook {
    fn alert(&self, activity: &SuspiciousActivity) {
        tracing::error!(
            activity_type = activity.activity_type.as_str(),
            user_id = activity.user_id.as_ref().map(UserId::as_str),
            ip_address = %activity.ip_address,
            metadata = %activity.metadata,
            "CRITICAL suspicious activity"
        );
    }
}

/// Fire-and-forget audit logger
#[derive(Clone)]
pub struct ActivityLog {
    sink: Arc<dyn AuditSink>,
    alerts: Arc<dyn AlertHook>,
}

impl ActivityLog {
    /// Log to `sink`, alerting through `alerts`
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, alerts: Arc<dyn AlertHook>) -> Self {
        Self { sink, alerts }
    }

    /// Record an activity, alerting operators when it is critical
    pub fn log(&self, activity: SuspiciousActivity) {
        tracing::warn!(
            activity_type = activity.activity_type.as_str(),
            severity = activity.severity.as_str(),
            user_id = activity.user_id.as_ref().map(UserId::as_str),
            ip_address = %activity.ip_address,
            "Suspicious activity detected"
        );
        metrics::record_suspicious_activity(activity.severity.as_str());

        if activity.severity == Severity::Critical {
            self.alerts.alert(&activity);
        }
        self.sink.record(activity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingAlertHook, RecordingAuditSink};
    use crate::types::ActivityType;
    use ticket_integrity_testing::test_epoch;

    fn activity(severity: Severity) -> SuspiciousActivity {
        SuspiciousActivity {
            user_id: Some(UserId::new("u-1")),
            activity_type: ActivityType::MultipleAccounts,
            severity,
            ip_address: "198.51.100.4".to_string(),
            metadata: serde_json::json!({ "accounts": 4 }),
            detected_at: test_epoch(),
        }
    }

    #[test]
    fn test_only_critical_activity_alerts() {
        let sink = RecordingAuditSink::new();
        let alerts = RecordingAlertHook::new();
        let log = ActivityLog::new(Arc::new(sink.clone()), Arc::new(alerts.clone()));

        log.log(activity(Severity::High));
        log.log(activity(Severity::Critical));

        assert_eq!(sink.records().len(), 2);
        assert_eq!(alerts.alerts().len(), 1);
        assert_eq!(alerts.alerts()[0].severity, Severity::Critical);
    }
}
