//! `PostgreSQL` ticket store.

use crate::{db_error, to_count};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use ticket_integrity::error::{IntegrityError, Result};
use ticket_integrity::providers::{TicketStore, Transition};
use ticket_integrity::types::{EventId, Ticket, TicketId, TicketStatus, UserId};

macro_rules! select_ticket {
    ($suffix:literal) => {
        concat!(
            "SELECT id, event_id, attendee_id, status, ticket_type, quantity, ",
            "checked_in, checked_in_at, checked_in_by, entry_point, reentry_override, ",
            "scanned_count, last_scanned_at, last_scanned_by ",
            "FROM tickets WHERE id = $1",
            $suffix
        )
    };
}

/// `PostgreSQL` ticket store.
///
/// Transactions lock the ticket row with `SELECT ... FOR UPDATE`, so
/// concurrent check-ins of one ticket queue behind each other and each sees
/// the previous one's write.
#[derive(Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a ticket.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn upsert(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO tickets (id, event_id, attendee_id, status, ticket_type, quantity,
                                 checked_in, checked_in_at, checked_in_by, entry_point, reentry_override,
                                 scanned_count, last_scanned_at, last_scanned_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                event_id = EXCLUDED.event_id,
                attendee_id = EXCLUDED.attendee_id,
                status = EXCLUDED.status,
                ticket_type = EXCLUDED.ticket_type,
                quantity = EXCLUDED.quantity,
                checked_in = EXCLUDED.checked_in,
                checked_in_at = EXCLUDED.checked_in_at,
                checked_in_by = EXCLUDED.checked_in_by,
                entry_point = EXCLUDED.entry_point,
                reentry_override = EXCLUDED.reentry_override,
                scanned_count = EXCLUDED.scanned_count,
                last_scanned_at = EXCLUDED.last_scanned_at,
                last_scanned_by = EXCLUDED.last_scanned_by
            ",
        )
        .bind(ticket.id.as_str())
        .bind(ticket.event_id.as_str())
        .bind(ticket.attendee_id.as_ref().map(UserId::as_str))
        .bind(ticket.status.as_str())
        .bind(&ticket.ticket_type)
        .bind(to_db_int(ticket.quantity)?)
        .bind(ticket.checked_in)
        .bind(ticket.checked_in_at)
        .bind(ticket.checked_in_by.as_deref())
        .bind(ticket.entry_point.as_deref())
        .bind(ticket.reentry_override)
        .bind(to_db_int(ticket.scanned_count)?)
        .bind(ticket.last_scanned_at)
        .bind(ticket.last_scanned_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("upsert ticket", &e))?;
        Ok(())
    }
}

fn to_db_int(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| IntegrityError::InvalidInput(format!("{value} out of range")))
}

fn from_db_int(column: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| IntegrityError::Corrupt(format!("negative {column}: {value}")))
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    let decode = |e: sqlx::Error| IntegrityError::Corrupt(format!("ticket row: {e}"));
    let status: String = row.try_get("status").map_err(decode)?;
    Ok(Ticket {
        id: TicketId::new(row.try_get::<String, _>("id").map_err(decode)?),
        event_id: EventId::new(row.try_get::<String, _>("event_id").map_err(decode)?),
        attendee_id: row
            .try_get::<Option<String>, _>("attendee_id")
            .map_err(decode)?
            .map(UserId::new),
        status: status.parse::<TicketStatus>()?,
        ticket_type: row.try_get("ticket_type").map_err(decode)?,
        quantity: from_db_int("quantity", row.try_get("quantity").map_err(decode)?)?,
        checked_in: row.try_get("checked_in").map_err(decode)?,
        checked_in_at: row.try_get("checked_in_at").map_err(decode)?,
        checked_in_by: row.try_get("checked_in_by").map_err(decode)?,
        entry_point: row.try_get("entry_point").map_err(decode)?,
        reentry_override: row.try_get("reentry_override").map_err(decode)?,
        scanned_count: from_db_int("scanned_count", row.try_get("scanned_count").map_err(decode)?)?,
        last_scanned_at: row.try_get("last_scanned_at").map_err(decode)?,
        last_scanned_by: row.try_get("last_scanned_by").map_err(decode)?,
    })
}

impl TicketStore for PostgresTicketStore {
    async fn get(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query(select_ticket!(""))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get ticket", &e))?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn transact<T, F>(&self, id: &TicketId, body: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Option<Ticket>) -> Transition<T> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin ticket transaction", &e))?;

        let row = sqlx::query(select_ticket!(" FOR UPDATE"))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("lock ticket", &e))?;
        let current = row.as_ref().map(ticket_from_row).transpose()?;

        match body(current) {
            Transition::Keep(outcome) => {
                tx.rollback()
                    .await
                    .map_err(|e| db_error("release ticket lock", &e))?;
                Ok(outcome)
            },
            Transition::Write { ticket, outcome } => {
                let updated = sqlx::query(
                    r"
                    UPDATE tickets SET
                        status = $2,
                        checked_in = $3,
                        checked_in_at = $4,
                        checked_in_by = $5,
                        entry_point = $6,
                        reentry_override = $7,
                        scanned_count = $8,
                        last_scanned_at = $9,
                        last_scanned_by = $10
                    WHERE id = $1
                    ",
                )
                .bind(ticket.id.as_str())
                .bind(ticket.status.as_str())
                .bind(ticket.checked_in)
                .bind(ticket.checked_in_at)
                .bind(ticket.checked_in_by.as_deref())
                .bind(ticket.entry_point.as_deref())
                .bind(ticket.reentry_override)
                .bind(to_db_int(ticket.scanned_count)?)
                .bind(ticket.last_scanned_at)
                .bind(ticket.last_scanned_by.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("update ticket", &e))?;

                if updated.rows_affected() != 1 {
                    return Err(IntegrityError::Storage(format!(
                        "ticket {} disappeared during check-in",
                        ticket.id
                    )));
                }

                tx.commit()
                    .await
                    .map_err(|e| db_error("commit ticket transaction", &e))?;
                tracing::debug!(ticket_id = %ticket.id, "Ticket transaction committed");
                Ok(outcome)
            },
        }
    }

    async fn count_active_for_attendee(&self, event_id: &EventId, attendee_id: &UserId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM tickets
            WHERE event_id = $1 AND attendee_id = $2 AND status IN ('pending', 'confirmed')
            ",
        )
        .bind(event_id.as_str())
        .bind(attendee_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count attendee tickets", &e))?;
        Ok(to_count(count))
    }
}
