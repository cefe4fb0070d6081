//! `PostgreSQL` storage for the ticket integrity providers.
//!
//! Implements every storage trait from `ticket_integrity::providers` on a
//! shared [`sqlx::PgPool`]:
//!
//! - [`PostgresTicketStore`]: tickets, with `SELECT ... FOR UPDATE` transactions
//! - [`PostgresPurchaseLedger`]: append-only purchase attempts
//! - [`PostgresBlacklist`]: blocked users, IP addresses and emails
//! - [`PostgresAuditSink`]: suspicious-activity records, written in the background
//! - [`PostgresAttendeeDirectory`] and [`PostgresEventPolicy`]: read-only lookups
//!
//! # Example
//!
//! ```ignore
//! use ticket_integrity_postgres::{migrate, PostgresTicketStore};
//!
//! let pool = sqlx::PgPool::connect("postgres://localhost/tickets").await?;
//! migrate(&pool).await?;
//! let tickets = PostgresTicketStore::new(pool.clone());
//! ```

mod activity;
mod blacklist;
mod directory;
mod ledger;
mod tickets;

pub use activity::PostgresAuditSink;
pub use blacklist::PostgresBlacklist;
pub use directory::{PostgresAttendeeDirectory, PostgresEventPolicy};
pub use ledger::PostgresPurchaseLedger;
pub use tickets::PostgresTicketStore;

use sqlx::PgPool;
use ticket_integrity::error::{IntegrityError, Result};

/// Run the bundled migrations.
///
/// # Errors
///
/// Returns error if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| IntegrityError::Storage(format!("Migration failed: {e}")))?;
    Ok(())
}

/// Check that the database answers.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| db_error("ping", &e))?;
    Ok(())
}

/// Classify a database failure.
pub(crate) fn db_error(context: &str, error: &sqlx::Error) -> IntegrityError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            IntegrityError::Unavailable
        },
        sqlx::Error::Database(db) if db.code().as_deref() == Some("40001") => {
            IntegrityError::Conflict(context.to_string())
        },
        other => IntegrityError::Storage(format!("Failed to {context}: {other}")),
    }
}

/// Narrow a database count to `u32`.
pub(crate) fn to_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}
