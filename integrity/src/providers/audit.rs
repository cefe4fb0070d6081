//! Suspicious-activity audit sink and operator alerting.

use crate::types::SuspiciousActivity;

/// Destination for suspicious-activity records.
///
/// Recording is fire-and-forget: implementations must not block the caller
/// and must swallow (and log) their own failures.
pub trait AuditSink: Send + Sync {
    /// Persist a record.
    fn record(&self, activity: SuspiciousActivity);
}

/// Notifies operators of critical activity.
pub trait AlertHook: Send + Sync {
    /// Raise an alert. Must not block.
    fn alert(&self, activity: &SuspiciousActivity);
}
