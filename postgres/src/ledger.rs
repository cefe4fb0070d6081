//! `PostgreSQL` purchase attempt ledger.

use crate::{db_error, to_count};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticket_integrity::error::Result;
use ticket_integrity::providers::PurchaseLedger;
use ticket_integrity::types::{EventId, PurchaseAttempt, UserId};

/// `PostgreSQL` purchase attempt ledger.
#[derive(Clone)]
pub struct PostgresPurchaseLedger {
    pool: PgPool,
}

impl PostgresPurchaseLedger {
    /// Create a ledger over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete attempts older than `before`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn prune_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM purchase_attempts WHERE attempted_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("prune purchase attempts", &e))?;
        Ok(result.rows_affected())
    }
}

impl PurchaseLedger for PostgresPurchaseLedger {
    async fn record(&self, attempt: PurchaseAttempt) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO purchase_attempts (user_id, event_id, ip_address, attempted_at, success, fingerprint)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(attempt.user_id.as_ref().map(UserId::as_str))
        .bind(attempt.event_id.as_str())
        .bind(&attempt.ip_address)
        .bind(attempt.attempted_at)
        .bind(attempt.success)
        .bind(attempt.fingerprint.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record purchase attempt", &e))?;
        Ok(())
    }

    async fn count_for_user_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_attempts WHERE user_id = $1 AND attempted_at >= $2",
        )
        .bind(user_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count user attempts", &e))?;
        Ok(to_count(count))
    }

    async fn count_for_ip_since(&self, ip_address: &str, since: DateTime<Utc>) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_attempts WHERE ip_address = $1 AND attempted_at >= $2",
        )
        .bind(ip_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count ip attempts", &e))?;
        Ok(to_count(count))
    }

    async fn count_for_event_ip_since(
        &self,
        event_id: &EventId,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM purchase_attempts
            WHERE event_id = $1 AND ip_address = $2 AND attempted_at >= $3
            ",
        )
        .bind(event_id.as_str())
        .bind(ip_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count event ip attempts", &e))?;
        Ok(to_count(count))
    }

    async fn distinct_ips_for_fingerprint_since(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r"
            SELECT DISTINCT ip_address FROM purchase_attempts
            WHERE fingerprint = $1 AND attempted_at >= $2
            ORDER BY ip_address
            ",
        )
        .bind(fingerprint)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list fingerprint ips", &e))
    }

    async fn recent_attempt_times_for_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_scalar(
            r"
            SELECT attempted_at FROM purchase_attempts
            WHERE user_id = $1 AND attempted_at >= $2
            ORDER BY attempted_at DESC
            LIMIT $3
            ",
        )
        .bind(user_id.as_str())
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list recent user attempts", &e))
    }
}
