//! `PostgreSQL` suspicious-activity audit sink.

use sqlx::PgPool;
use ticket_integrity::metrics;
use ticket_integrity::providers::AuditSink;
use ticket_integrity::types::{SuspiciousActivity, UserId};
use tokio::runtime::Handle;

/// Writes suspicious-activity records to `suspicious_activities`.
///
/// Each insert runs as its own task so the screening path never waits on the
/// audit table. Failed inserts are logged and counted, then dropped.
#[derive(Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    /// Create a sink over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one record, waiting for the write.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn insert(&self, activity: &SuspiciousActivity) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO suspicious_activities (user_id, activity_type, severity, ip_address, metadata, detected_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(activity.user_id.as_ref().map(UserId::as_str))
        .bind(activity.activity_type.as_str())
        .bind(activity.severity.as_str())
        .bind(&activity.ip_address)
        .bind(&activity.metadata)
        .bind(activity.detected_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl AuditSink for PostgresAuditSink {
    fn record(&self, activity: SuspiciousActivity) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(
                activity_type = activity.activity_type.as_str(),
                "No runtime available, suspicious activity not persisted"
            );
            metrics::record_audit_failure();
            return;
        };

        let sink = self.clone();
        handle.spawn(async move {
            if let Err(error) = sink.insert(&activity).await {
                tracing::warn!(
                    %error,
                    activity_type = activity.activity_type.as_str(),
                    "Failed to persist suspicious activity"
                );
                metrics::record_audit_failure();
            }
        });
    }
}
