//! Application state shared across HTTP handlers.
//!
//! The check-in engine and fraud guard are generic over their providers, so
//! the state is generic over a [`Backend`] naming one concrete provider per
//! seam. The server binary picks [`PostgresBackend`] or [`MemoryBackend`] at
//! startup; handlers are written once against `AppState<B>`.

use sqlx::PgPool;
use std::sync::Arc;
use ticket_integrity::activity::{ActivityLog, TracingAlertHook};
use ticket_integrity::checkin::CheckInEngine;
use ticket_integrity::config::IntegrityConfig;
use ticket_integrity::fraud::FraudGuard;
use ticket_integrity::mocks::{
    InMemoryAttendeeDirectory, InMemoryBlacklist, InMemoryEventPolicy, InMemoryPurchaseLedger,
    InMemoryTicketStore, RecordingAuditSink,
};
use ticket_integrity::providers::{
    AlertHook, AttendeeDirectory, AuditSink, Blacklist, EventPolicy, PurchaseLedger, TicketStore,
};
use ticket_integrity_core::environment::Clock;
use ticket_integrity_postgres::{
    PostgresAttendeeDirectory, PostgresAuditSink, PostgresBlacklist, PostgresEventPolicy,
    PostgresPurchaseLedger, PostgresTicketStore,
};

/// One concrete provider per storage seam.
pub trait Backend: Send + Sync + 'static {
    /// Ticket storage
    type Tickets: TicketStore + Clone + 'static;
    /// Attendee names
    type Directory: AttendeeDirectory + 'static;
    /// Per-event settings
    type Policy: EventPolicy + Clone + 'static;
    /// Purchase attempt history
    type Ledger: PurchaseLedger + 'static;
    /// Blocked users, IPs and emails
    type Blacklist: Blacklist + 'static;
}

/// `PostgreSQL` providers
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    type Tickets = PostgresTicketStore;
    type Directory = PostgresAttendeeDirectory;
    type Policy = PostgresEventPolicy;
    type Ledger = PostgresPurchaseLedger;
    type Blacklist = PostgresBlacklist;
}

/// In-memory providers
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    type Tickets = InMemoryTicketStore;
    type Directory = InMemoryAttendeeDirectory;
    type Policy = InMemoryEventPolicy;
    type Ledger = InMemoryPurchaseLedger;
    type Blacklist = InMemoryBlacklist;
}

/// The in-memory stores behind a [`MemoryBackend`] state.
///
/// Clones share data, so a caller can keep a copy to seed tickets or inspect
/// audit records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    /// Tickets
    pub tickets: InMemoryTicketStore,
    /// Attendee names
    pub directory: InMemoryAttendeeDirectory,
    /// Event settings
    pub policy: InMemoryEventPolicy,
    /// Purchase attempts
    pub ledger: InMemoryPurchaseLedger,
    /// Blacklist
    pub blacklist: InMemoryBlacklist,
    /// Suspicious-activity records
    pub audit: RecordingAuditSink,
}

/// Application state shared across all HTTP handlers.
pub struct AppState<B: Backend> {
    /// Gate check-ins
    pub check_in: Arc<CheckInEngine<B::Tickets, B::Directory, B::Policy>>,
    /// Purchase screening and activity reporting
    pub fraud: Arc<FraudGuard<B::Ledger, B::Blacklist, B::Tickets, B::Policy>>,
    /// Time source for records stamped by handlers
    pub clock: Arc<dyn Clock>,
    /// Pool probed by the readiness check; `None` for in-memory storage
    pub database: Option<PgPool>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            check_in: Arc::clone(&self.check_in),
            fraud: Arc::clone(&self.fraud),
            clock: Arc::clone(&self.clock),
            database: self.database.clone(),
        }
    }
}

impl<B: Backend> AppState<B> {
    #[allow(clippy::too_many_arguments)] // One argument per provider seam
    fn assemble(
        tickets: B::Tickets,
        directory: B::Directory,
        policy: B::Policy,
        ledger: B::Ledger,
        blacklist: B::Blacklist,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: &IntegrityConfig,
        database: Option<PgPool>,
    ) -> Self {
        let alerts: Arc<dyn AlertHook> = Arc::new(TracingAlertHook);
        let check_in = CheckInEngine::new(
            tickets.clone(),
            directory,
            policy.clone(),
            Arc::clone(&clock),
            config.check_in.clone(),
        );
        let fraud = FraudGuard::new(
            ledger,
            blacklist,
            tickets,
            policy,
            ActivityLog::new(audit, alerts),
            Arc::clone(&clock),
            config.fraud.clone(),
        );

        Self {
            check_in: Arc::new(check_in),
            fraud: Arc::new(fraud),
            clock,
            database,
        }
    }
}

impl AppState<PostgresBackend> {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool, clock: Arc<dyn Clock>, config: &IntegrityConfig) -> Self {
        Self::assemble(
            PostgresTicketStore::new(pool.clone()),
            PostgresAttendeeDirectory::new(pool.clone()),
            PostgresEventPolicy::new(pool.clone()),
            PostgresPurchaseLedger::new(pool.clone()),
            PostgresBlacklist::new(pool.clone()),
            Arc::new(PostgresAuditSink::new(pool.clone())),
            clock,
            config,
            Some(pool),
        )
    }
}

impl AppState<MemoryBackend> {
    /// State backed by process memory.
    #[must_use]
    pub fn in_memory(stores: MemoryStores, clock: Arc<dyn Clock>, config: &IntegrityConfig) -> Self {
        Self::assemble(
            stores.tickets,
            stores.directory,
            stores.policy,
            stores.ledger,
            stores.blacklist,
            Arc::new(stores.audit),
            clock,
            config,
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_integrity_core::environment::SystemClock;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<MemoryBackend>>();
        assert_clone::<AppState<PostgresBackend>>();
    }

    #[test]
    fn test_in_memory_state_has_no_database() {
        let state = AppState::in_memory(
            MemoryStores::default(),
            Arc::new(SystemClock),
            &IntegrityConfig::default(),
        );
        assert!(state.database.is_none());
    }
}
