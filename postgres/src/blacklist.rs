//! `PostgreSQL` blacklist.

use crate::db_error;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use ticket_integrity::error::{IntegrityError, Result};
use ticket_integrity::providers::Blacklist;
use ticket_integrity::types::{BlacklistEntry, BlacklistKind};

/// `PostgreSQL` blacklist keyed by `(kind, value)`.
#[derive(Clone)]
pub struct PostgresBlacklist {
    pool: PgPool,
}

impl PostgresBlacklist {
    /// Create a blacklist over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove an entry. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn remove(&self, kind: BlacklistKind, value: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blacklist WHERE kind = $1 AND value = $2")
            .bind(kind.as_str())
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("remove blacklist entry", &e))?;
        Ok(result.rows_affected() > 0)
    }
}

impl Blacklist for PostgresBlacklist {
    async fn find_active(
        &self,
        kind: BlacklistKind,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BlacklistEntry>> {
        let row = sqlx::query(
            r"
            SELECT kind, value, reason, expires_at FROM blacklist
            WHERE kind = $1 AND value = $2 AND (expires_at IS NULL OR expires_at >= $3)
            ",
        )
        .bind(kind.as_str())
        .bind(value)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("look up blacklist", &e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let decode = |e: sqlx::Error| IntegrityError::Corrupt(format!("blacklist row: {e}"));
        let kind: String = row.try_get("kind").map_err(decode)?;
        Ok(Some(BlacklistEntry {
            kind: kind.parse()?,
            value: row.try_get("value").map_err(decode)?,
            reason: row.try_get("reason").map_err(decode)?,
            expires_at: row.try_get("expires_at").map_err(decode)?,
        }))
    }

    async fn add(&self, entry: BlacklistEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO blacklist (kind, value, reason, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, value) DO UPDATE SET
                reason = EXCLUDED.reason,
                expires_at = EXCLUDED.expires_at,
                created_at = now()
            ",
        )
        .bind(entry.kind.as_str())
        .bind(&entry.value)
        .bind(&entry.reason)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("add blacklist entry", &e))?;
        tracing::info!(kind = entry.kind.as_str(), "Blacklist entry stored");
        Ok(())
    }
}
