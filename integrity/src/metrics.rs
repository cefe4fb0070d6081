//! Metrics for gate check-in and fraud screening.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticket_integrity_check_ins_total{outcome}` - Check-in results (valid, already_checked_in, invalid)
//! - `ticket_integrity_overrides_total` - Supervisor overrides
//! - `ticket_integrity_fraud_decisions_total{stage}` - Screening decisions (allowed or the denying stage)
//! - `ticket_integrity_suspicious_activity_total{severity}` - Audit records written
//! - `ticket_integrity_audit_failures_total` - Audit or ledger writes that failed
//! - `ticket_integrity_fail_open_total{check}` - Fraud checks skipped because a read failed

use metrics::describe_counter;

/// Initialize and register all metric descriptions.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(
        "ticket_integrity_check_ins_total",
        "Check-in attempts by outcome (valid, already_checked_in, invalid)"
    );
    describe_counter!(
        "ticket_integrity_overrides_total",
        "Check-ins forced through by a supervisor override"
    );
    describe_counter!(
        "ticket_integrity_fraud_decisions_total",
        "Purchase screening decisions by stage (allowed, blacklist, rate_limit, ticket_cap, bot_detection)"
    );
    describe_counter!(
        "ticket_integrity_suspicious_activity_total",
        "Suspicious activity records by severity"
    );
    describe_counter!(
        "ticket_integrity_audit_failures_total",
        "Audit log or purchase ledger writes that failed"
    );
    describe_counter!(
        "ticket_integrity_fail_open_total",
        "Fraud checks skipped because their data could not be read"
    );

    tracing::info!("Ticket integrity metrics registered");
}

/// Record a check-in result.
///
/// # Arguments
///
/// * `outcome` - `valid`, `already_checked_in` or `invalid`
pub fn record_check_in(outcome: &'static str) {
    metrics::counter!("ticket_integrity_check_ins_total", "outcome" => outcome).increment(1);
}

/// Record a supervisor override.
pub fn record_override() {
    metrics::counter!("ticket_integrity_overrides_total").increment(1);
}

/// Record a screening decision.
///
/// # Arguments
///
/// * `stage` - `allowed`, or the name of the stage that denied
pub fn record_fraud_decision(stage: &'static str) {
    metrics::counter!("ticket_integrity_fraud_decisions_total", "stage" => stage).increment(1);
}

/// Record a suspicious-activity record.
pub fn record_suspicious_activity(severity: &'static str) {
    metrics::counter!("ticket_integrity_suspicious_activity_total", "severity" => severity)
        .increment(1);
}

/// Record a failed audit or ledger write.
pub fn record_audit_failure() {
    metrics::counter!("ticket_integrity_audit_failures_total").increment(1);
}

/// Record a fraud check that was skipped because its data could not be read.
pub fn record_fail_open(check: &'static str) {
    metrics::counter!("ticket_integrity_fail_open_total", "check" => check).increment(1);
}
