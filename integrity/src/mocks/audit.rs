//! Recording audit sink and alert hook.

use crate::providers::{AlertHook, AuditSink};
use crate::types::SuspiciousActivity;
use std::sync::{Arc, Mutex, PoisonError};

/// Audit sink that keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    records: Arc<Mutex<Vec<SuspiciousActivity>>>,
}

impl RecordingAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far.
    #[must_use]
    pub fn records(&self) -> Vec<SuspiciousActivity> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, activity: SuspiciousActivity) {
        tracing::debug!(
            activity_type = activity.activity_type.as_str(),
            severity = activity.severity.as_str(),
            "Mock recorded suspicious activity"
        );
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(activity);
    }
}

/// Alert hook that keeps alerts in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertHook {
    alerts: Arc<Mutex<Vec<SuspiciousActivity>>>,
}

impl RecordingAlertHook {
    /// Create a hook with no alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts raised so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<SuspiciousActivity> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertHook for RecordingAlertHook {
    fn alert(&self, activity: &SuspiciousActivity) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(activity.clone());
    }
}
