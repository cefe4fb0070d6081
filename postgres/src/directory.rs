//! `PostgreSQL` lookups for attendee names and event settings.

use crate::db_error;
use sqlx::PgPool;
use ticket_integrity::error::Result;
use ticket_integrity::providers::{AttendeeDirectory, EventPolicy};
use ticket_integrity::types::{EventId, UserId};

/// Reads display names from the `users` table.
#[derive(Clone)]
pub struct PostgresAttendeeDirectory {
    pool: PgPool,
}

impl PostgresAttendeeDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AttendeeDirectory for PostgresAttendeeDirectory {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT display_name FROM users WHERE id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("look up attendee", &e))?;
        Ok(name.flatten())
    }
}

/// Reads per-event settings from the `events` table.
///
/// Unknown events fall back to the defaults: no explicit cap and no re-entry.
#[derive(Clone)]
pub struct PostgresEventPolicy {
    pool: PgPool,
}

impl PostgresEventPolicy {
    /// Create a policy reader over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventPolicy for PostgresEventPolicy {
    async fn max_tickets_per_user(&self, event_id: &EventId) -> Result<Option<u32>> {
        let cap: Option<Option<i32>> =
            sqlx::query_scalar("SELECT max_tickets_per_user FROM events WHERE id = $1")
                .bind(event_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("look up ticket cap", &e))?;
        Ok(cap.flatten().and_then(|cap| u32::try_from(cap).ok()))
    }

    async fn allow_reentry(&self, event_id: &EventId) -> Result<bool> {
        let allow: Option<bool> = sqlx::query_scalar("SELECT allow_reentry FROM events WHERE id = $1")
            .bind(event_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("look up re-entry policy", &e))?;
        Ok(allow.unwrap_or(false))
    }
}
