//! Scanner behaviour against the real store runtime.
//!
//! Timers run on tokio's paused clock; the duplicate window is driven by a
//! manual wall clock.
//!
//! Run with: `cargo test -p ticket-integrity --test scan_controller`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use ticket_integrity::checkin::{CheckInEngine, CheckInResult, InvalidReason};
use ticket_integrity::config::{CheckInConfig, ScanConfig};
use ticket_integrity::error::ScanError;
use ticket_integrity::mocks::{InMemoryAttendeeDirectory, InMemoryEventPolicy, InMemoryTicketStore};
use ticket_integrity::providers::CheckInHandler;
use ticket_integrity::scan::{
    EngineCheckInHandler, ScanAction, ScanController, ScanEnvironment, ScanPhase, ScanReply,
};
use ticket_integrity::types::{EventId, Ticket, TicketId, TicketStatus};
use ticket_integrity_testing::ManualClock;
use tokio::sync::Notify;

const WAIT: Duration = Duration::from_secs(5);

/// Handler whose calls block until released, counting invocations.
#[derive(Default)]
struct GatedHandler {
    calls: AtomicUsize,
    release: Arc<Notify>,
}

impl CheckInHandler for GatedHandler {
    fn check_in(&self, _ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let release = Arc::clone(&self.release);
        Box::pin(async move {
            release.notified().await;
            Ok(CheckInResult::Invalid {
                reason: InvalidReason::NotFound,
            })
        })
    }
}

/// Handler that always fails.
struct FailingHandler;

impl CheckInHandler for FailingHandler {
    fn check_in(&self, _ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
        Box::pin(async { Err(ScanError::Transport("connection refused".into())) })
    }
}

async fn engine_scanner(clock: &ManualClock) -> (ScanController, InMemoryTicketStore) {
    let store = InMemoryTicketStore::new();
    store
        .insert(Ticket::new("abc123", "e-1", TicketStatus::Confirmed))
        .await;
    store
        .insert(Ticket::new("def456", "e-1", TicketStatus::Confirmed))
        .await;
    let engine = Arc::new(CheckInEngine::new(
        store.clone(),
        InMemoryAttendeeDirectory::new(),
        InMemoryEventPolicy::new(),
        Arc::new(clock.clone()),
        CheckInConfig::default(),
    ));
    let handler = EngineCheckInHandler::new(engine, EventId::new("e-1"), "north-gate", "staff-1");
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::new(handler),
        ScanConfig::default(),
    ));
    (scanner, store)
}

fn scan(raw: &str) -> ScanAction {
    ScanAction::Scan { raw: raw.into() }
}

#[tokio::test(start_paused = true)]
async fn test_result_shown_for_cooldown_then_rearms() {
    let clock = ManualClock::starting_at_epoch();
    let (scanner, store) = engine_scanner(&clock).await;

    let reply = scanner
        .submit_and_wait(scan("https://tix.example.com/tickets/abc123"), WAIT)
        .await
        .unwrap();
    let ScanReply::Completed(outcome) = reply else {
        panic!("expected a completed check-in, got {reply:?}");
    };
    assert!(outcome.result.is_valid());
    assert!(store.get_ticket("abc123").await.unwrap().checked_in);

    tokio::time::sleep(Duration::from_millis(1199)).await;
    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::ShowingResult);

    tokio::time::sleep(Duration::from_millis(2)).await;
    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::Scanning);
    assert!(state.outcome.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_repeat_reads_within_window_ignored() {
    let clock = ManualClock::starting_at_epoch();
    let (scanner, _store) = engine_scanner(&clock).await;

    let first = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();
    assert!(matches!(first, ScanReply::Completed(_)));
    tokio::time::sleep(Duration::from_millis(1300)).await;

    // Back to scanning, but still inside the 3 s window on the wall clock
    clock.advance(chrono::Duration::milliseconds(2999));
    let repeat = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();
    assert_eq!(repeat, ScanReply::Ignored);

    // At the window boundary the same code is checked in again and reported as a duplicate
    clock.advance(chrono::Duration::milliseconds(1));
    let again = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();
    let ScanReply::Completed(outcome) = again else {
        panic!("expected a completed check-in, got {again:?}");
    };
    assert!(matches!(outcome.result, CheckInResult::AlreadyCheckedIn { .. }));
    tokio::time::sleep(Duration::from_millis(1300)).await;

    // A different code is never held back by the window
    let other = scanner.submit_and_wait(scan("def456"), WAIT).await.unwrap();
    assert!(matches!(other, ScanReply::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_one_check_in_in_flight() {
    let clock = ManualClock::starting_at_epoch();
    let handler = Arc::new(GatedHandler::default());
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::clone(&handler) as Arc<dyn CheckInHandler>,
        ScanConfig::default(),
    ));

    scanner.handle_scan("abc123").await.unwrap();
    scanner.handle_scan("def456").await.unwrap();
    scanner.manual_entry("ghi789").await.unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(scanner.snapshot().await.phase, ScanPhase::Processing);

    handler.release.notify_one();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::ShowingResult);
    assert_eq!(state.outcome.unwrap().ticket_id, TicketId::new("abc123"));
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_call_discards_late_result() {
    let clock = ManualClock::starting_at_epoch();
    let handler = Arc::new(GatedHandler::default());
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::clone(&handler) as Arc<dyn CheckInHandler>,
        ScanConfig::default(),
    ));

    scanner.handle_scan("abc123").await.unwrap();
    scanner.reset().await.unwrap();

    // Ready on screen, but the processing lock still holds
    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::Scanning);
    assert!(state.in_flight);
    scanner.handle_scan("def456").await.unwrap();
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    handler.release.notify_one();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = scanner.snapshot().await;
    assert!(state.is_ready());
    assert!(state.outcome.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_cooldown() {
    let clock = ManualClock::starting_at_epoch();
    let (scanner, _store) = engine_scanner(&clock).await;

    let _ = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(scanner.pending_effects(), 1);
    scanner.reset().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scanner.pending_effects(), 0);

    let reply = scanner.submit_and_wait(scan("def456"), WAIT).await.unwrap();
    assert!(matches!(reply, ScanReply::Completed(_)));

    // The first result's timer would have fired here had it survived the reset
    tokio::time::sleep(Duration::from_millis(1150)).await;
    assert_eq!(scanner.snapshot().await.phase, ScanPhase::ShowingResult);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(scanner.snapshot().await.phase, ScanPhase::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_failed_call_returns_to_scanning() {
    let clock = ManualClock::starting_at_epoch();
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::new(FailingHandler),
        ScanConfig::default(),
    ));

    let reply = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();

    assert!(matches!(reply, ScanReply::Failed(_)));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let state = scanner.snapshot().await;
    assert!(state.is_ready());
    assert!(state.outcome.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_cooldown() {
    let clock = ManualClock::starting_at_epoch();
    let (scanner, _store) = engine_scanner(&clock).await;

    let _ = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    scanner.shutdown(Duration::from_secs(1)).await.unwrap();

    assert!(scanner.handle_scan("def456").await.is_err());
}

/// Handler whose call panics.
struct PanickingHandler;

impl CheckInHandler for PanickingHandler {
    fn check_in(&self, _ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
        Box::pin(async { panic!("handler blew up") })
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_call_releases_scanner() {
    let clock = ManualClock::starting_at_epoch();
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::new(PanickingHandler),
        ScanConfig::default(),
    ));

    let reply = scanner.submit_and_wait(scan("abc123"), WAIT).await.unwrap();

    assert!(matches!(reply, ScanReply::Failed(_)));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::Scanning);
    assert!(!state.in_flight);
    assert!(state.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_uses_typed_code() {
    let clock = ManualClock::starting_at_epoch();
    let handler = Arc::new(GatedHandler::default());
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::clone(&handler) as Arc<dyn CheckInHandler>,
        ScanConfig::default(),
    ));

    scanner.manual_entry("TKT.2024.0001").await.unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    let state = scanner.snapshot().await;
    assert_eq!(state.phase, ScanPhase::Processing);
    assert_eq!(state.last_scan.unwrap().ticket_id, TicketId::new("TKT.2024.0001"));
}
