//! Purchase screening scenarios.
//!
//! Run with: `cargo test -p ticket-integrity --test fraud_guard`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticket_integrity::activity::ActivityLog;
use ticket_integrity::config::FraudConfig;
use ticket_integrity::fraud::{FraudDecision, FraudGuard, FraudStage};
use ticket_integrity::mocks::{
    InMemoryBlacklist, InMemoryEventPolicy, InMemoryPurchaseLedger, InMemoryTicketStore,
    RecordingAlertHook, RecordingAuditSink,
};
use ticket_integrity::types::{
    ActivityType, BlacklistEntry, BlacklistKind, EventId, PurchaseAttempt, PurchaseIntent, Severity,
    SuspiciousActivity, Ticket, TicketStatus, UserId,
};
use ticket_integrity_testing::{ManualClock, test_epoch};

type Guard = FraudGuard<InMemoryPurchaseLedger, InMemoryBlacklist, InMemoryTicketStore, InMemoryEventPolicy>;

struct Harness {
    guard: Guard,
    clock: ManualClock,
    ledger: InMemoryPurchaseLedger,
    blacklist: InMemoryBlacklist,
    tickets: InMemoryTicketStore,
    policy: InMemoryEventPolicy,
    audit: RecordingAuditSink,
    alerts: RecordingAlertHook,
}

fn harness() -> Harness {
    harness_with(FraudConfig::default())
}

fn harness_with(config: FraudConfig) -> Harness {
    let clock = ManualClock::starting_at_epoch();
    let ledger = InMemoryPurchaseLedger::new();
    let blacklist = InMemoryBlacklist::new();
    let tickets = InMemoryTicketStore::new();
    let policy = InMemoryEventPolicy::new();
    let audit = RecordingAuditSink::new();
    let alerts = RecordingAlertHook::new();
    let guard = FraudGuard::new(
        ledger.clone(),
        blacklist.clone(),
        tickets.clone(),
        policy.clone(),
        ActivityLog::new(Arc::new(audit.clone()), Arc::new(alerts.clone())),
        Arc::new(clock.clone()),
        config,
    );
    Harness {
        guard,
        clock,
        ledger,
        blacklist,
        tickets,
        policy,
        audit,
        alerts,
    }
}

fn intent(user: Option<&str>, ip: &str) -> PurchaseIntent {
    PurchaseIntent {
        user_id: user.map(UserId::new),
        email: None,
        ip_address: ip.to_string(),
        event_id: EventId::new("e-1"),
        quantity: 1,
        fingerprint: None,
    }
}

fn attempt(user: Option<&str>, ip: &str, at: DateTime<Utc>) -> PurchaseAttempt {
    PurchaseAttempt {
        user_id: user.map(UserId::new),
        event_id: EventId::new("e-1"),
        ip_address: ip.to_string(),
        attempted_at: at,
        success: true,
        fingerprint: None,
    }
}

fn stage(decision: &FraudDecision) -> Option<FraudStage> {
    match decision {
        FraudDecision::Denied { stage, .. } => Some(*stage),
        FraudDecision::Allowed { .. } => None,
    }
}

// ============================================================================
// Blacklist
// ============================================================================

#[tokio::test]
async fn test_blacklisted_ip_denied_and_attempt_recorded_as_failed() {
    let h = harness();
    h.blacklist.block(BlacklistEntry {
        kind: BlacklistKind::Ip,
        value: "203.0.113.9".into(),
        reason: "card testing".into(),
        expires_at: None,
    });

    let decision = h.guard.screen(&intent(Some("u-1"), "203.0.113.9")).await;

    assert_eq!(stage(&decision), Some(FraudStage::Blacklist));
    let attempts = h.ledger.attempts();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].success);
    // The operator's reason never reaches the purchaser
    if let FraudDecision::Denied { reason, .. } = decision {
        assert!(!reason.contains("card testing"));
    }
}

#[tokio::test]
async fn test_expired_blacklist_entry_is_ignored() {
    let h = harness();
    h.blacklist.block(BlacklistEntry {
        kind: BlacklistKind::User,
        value: "u-1".into(),
        reason: "cooling off".into(),
        expires_at: Some(test_epoch() - Duration::minutes(1)),
    });

    let decision = h.guard.screen(&intent(Some("u-1"), "198.51.100.1")).await;

    assert!(decision.is_allowed());
}

#[tokio::test]
async fn test_blacklisted_email_matches_case_insensitively() {
    let h = harness();
    h.guard
        .add_to_blacklist(BlacklistEntry {
            kind: BlacklistKind::Email,
            value: "Scalper@Example.com".into(),
            reason: "resale ring".into(),
            expires_at: None,
        })
        .await
        .unwrap();

    let mut purchase = intent(None, "198.51.100.1");
    purchase.email = Some(" scalper@example.COM".into());
    let decision = h.guard.screen(&purchase).await;

    assert_eq!(stage(&decision), Some(FraudStage::Blacklist));
    assert!(!h.ledger.attempts()[0].success);
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_user_rate_limit_boundary() {
    let h = harness();
    let start = test_epoch();
    // Ten prior attempts spread over 4.5 minutes, each from its own address
    for n in 0..10 {
        h.ledger.seed(attempt(
            Some("u-1"),
            &format!("198.51.100.{n}"),
            start + Duration::seconds(30 * n),
        ));
    }
    h.clock.set(start + Duration::seconds(280));

    let decision = h.guard.screen(&intent(Some("u-1"), "192.0.2.50")).await;
    assert_eq!(stage(&decision), Some(FraudStage::RateLimit));

    // Six minutes after the first attempt the oldest ones have left the window
    let h = harness();
    for n in 0..10 {
        h.ledger.seed(attempt(
            Some("u-1"),
            &format!("198.51.100.{n}"),
            start + Duration::seconds(30 * n),
        ));
    }
    h.clock.set(start + Duration::minutes(6));

    let decision = h.guard.screen(&intent(Some("u-1"), "192.0.2.50")).await;
    assert!(decision.is_allowed(), "{decision:?}");
}

#[tokio::test]
async fn test_nine_prior_attempts_allowed() {
    let h = harness();
    let start = test_epoch();
    for n in 0..9 {
        h.ledger.seed(attempt(
            Some("u-1"),
            &format!("198.51.100.{n}"),
            start + Duration::seconds(20 * n),
        ));
    }
    h.clock.set(start + Duration::seconds(200));

    let decision = h.guard.screen(&intent(Some("u-1"), "192.0.2.50")).await;
    assert!(decision.is_allowed(), "{decision:?}");
}

#[tokio::test]
async fn test_event_ip_rate_limit_applies_to_guests() {
    let h = harness();
    let start = test_epoch();
    for n in 0..5 {
        h.ledger
            .seed(attempt(None, "198.51.100.7", start + Duration::seconds(40 * n)));
    }
    h.clock.set(start + Duration::seconds(200));

    let decision = h.guard.screen(&intent(None, "198.51.100.7")).await;

    assert_eq!(stage(&decision), Some(FraudStage::RateLimit));
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].activity_type, ActivityType::RapidPurchases);
}

#[tokio::test]
async fn test_screening_records_each_attempt() {
    let h = harness();
    for _ in 0..5 {
        h.clock.advance(Duration::seconds(10));
        let decision = h.guard.screen(&intent(None, "198.51.100.7")).await;
        assert!(decision.is_allowed());
    }

    // The sixth attempt from the same address for the same event is denied
    h.clock.advance(Duration::seconds(10));
    let decision = h.guard.screen(&intent(None, "198.51.100.7")).await;
    assert_eq!(stage(&decision), Some(FraudStage::RateLimit));

    let attempts = h.ledger.attempts();
    assert_eq!(attempts.len(), 6);
    assert_eq!(attempts.iter().filter(|a| a.success).count(), 5);
}

// ============================================================================
// Ticket cap
// ============================================================================

#[tokio::test]
async fn test_ticket_cap_boundaries() {
    let h = harness();
    h.policy.set_max_tickets("e-1", 2);
    h.tickets
        .insert(Ticket::new("held-1", "e-1", TicketStatus::Confirmed).with_attendee("u-1"))
        .await;
    // Refunded tickets do not count toward the cap
    h.tickets
        .insert(Ticket::new("old", "e-1", TicketStatus::Refunded).with_attendee("u-1"))
        .await;

    let decision = h.guard.screen(&intent(Some("u-1"), "198.51.100.1")).await;
    assert_eq!(
        decision,
        FraudDecision::Allowed {
            remaining_allowance: Some(1)
        }
    );

    h.tickets
        .insert(Ticket::new("held-2", "e-1", TicketStatus::Pending).with_attendee("u-1"))
        .await;
    h.clock.advance(Duration::minutes(1));

    let decision = h.guard.screen(&intent(Some("u-1"), "198.51.100.1")).await;
    match decision {
        FraudDecision::Denied { stage, reason } => {
            assert_eq!(stage, FraudStage::TicketCap);
            assert!(reason.contains("0 remaining"), "{reason}");
        },
        FraudDecision::Allowed { .. } => panic!("purchase over the cap was allowed"),
    }
}

#[tokio::test]
async fn test_quantity_over_remaining_is_denied() {
    let h = harness();
    h.tickets
        .insert(Ticket::new("held-1", "e-1", TicketStatus::Confirmed).with_attendee("u-1"))
        .await;

    let mut purchase = intent(Some("u-1"), "198.51.100.1");
    purchase.quantity = 10;
    let decision = h.guard.screen(&purchase).await;

    match decision {
        FraudDecision::Denied { stage, reason } => {
            assert_eq!(stage, FraudStage::TicketCap);
            assert!(reason.contains("9 remaining"), "{reason}");
        },
        FraudDecision::Allowed { .. } => panic!("purchase over the default cap was allowed"),
    }
}

#[tokio::test]
async fn test_guests_skip_the_cap() {
    let h = harness();
    let mut purchase = intent(None, "198.51.100.1");
    purchase.quantity = 50;

    assert_eq!(
        h.guard.screen(&purchase).await,
        FraudDecision::Allowed {
            remaining_allowance: None
        }
    );
}

// ============================================================================
// Bot detection
// ============================================================================

#[tokio::test]
async fn test_fingerprint_fan_out() {
    let h = harness();
    let start = test_epoch();
    for n in 0..4 {
        let mut prior = attempt(None, &format!("198.51.100.{n}"), start + Duration::minutes(n));
        prior.fingerprint = Some("fp-1".into());
        h.ledger.seed(prior);
    }
    h.clock.set(start + Duration::minutes(10));

    // Reusing a known address keeps the count at four; a fifth address is flagged
    let mut fourth_ip = intent(None, "198.51.100.0");
    fourth_ip.fingerprint = Some("fp-1".into());
    assert!(h.guard.screen(&fourth_ip).await.is_allowed());

    let mut fifth_ip = intent(None, "192.0.2.99");
    fifth_ip.fingerprint = Some("fp-1".into());
    let decision = h.guard.screen(&fifth_ip).await;

    assert_eq!(stage(&decision), Some(FraudStage::BotDetection));
    let bot_records: Vec<SuspiciousActivity> = h
        .audit
        .records()
        .into_iter()
        .filter(|r| r.activity_type == ActivityType::BotBehavior)
        .collect();
    assert_eq!(bot_records.len(), 1);
    assert_eq!(bot_records[0].severity, Severity::High);
    assert_eq!(bot_records[0].metadata["distinct_ips"], 5);
}

#[tokio::test]
async fn test_fingerprint_threshold_never_flags_a_single_address() {
    let h = harness_with(FraudConfig {
        fingerprint_ip_threshold: 0,
        ..FraudConfig::default()
    });

    let mut purchase = intent(None, "192.0.2.10");
    purchase.fingerprint = Some("fp-1".into());
    assert!(h.guard.screen(&purchase).await.is_allowed());

    let mut second_ip = intent(None, "192.0.2.11");
    second_ip.fingerprint = Some("fp-1".into());
    let decision = h.guard.screen(&second_ip).await;
    assert_eq!(stage(&decision), Some(FraudStage::BotDetection));
}

#[tokio::test]
async fn test_old_fingerprint_use_is_forgotten() {
    let h = harness();
    let start = test_epoch();
    for n in 0..4 {
        let mut prior = attempt(None, &format!("198.51.100.{n}"), start);
        prior.fingerprint = Some("fp-1".into());
        h.ledger.seed(prior);
    }
    h.clock.set(start + Duration::minutes(61));

    let mut purchase = intent(None, "192.0.2.99");
    purchase.fingerprint = Some("fp-1".into());
    assert!(h.guard.screen(&purchase).await.is_allowed());
}

#[tokio::test]
async fn test_machine_speed_attempts_flagged() {
    let h = harness();
    let start = test_epoch();
    // Five attempts 500 ms apart, each on a different event and address
    for n in 0..5 {
        let mut prior = attempt(
            Some("u-1"),
            &format!("198.51.100.{n}"),
            start + Duration::milliseconds(500 * n),
        );
        prior.event_id = EventId::new(format!("e-{n}"));
        h.ledger.seed(prior);
    }
    h.clock.set(start + Duration::seconds(3));

    let decision = h.guard.screen(&intent(Some("u-1"), "192.0.2.50")).await;

    assert_eq!(stage(&decision), Some(FraudStage::BotDetection));
    if let FraudDecision::Denied { reason, .. } = &decision {
        // Same wording as other opaque denials
        assert!(!reason.to_lowercase().contains("bot"));
    }
}

#[tokio::test]
async fn test_human_speed_attempts_allowed() {
    let h = harness();
    let start = test_epoch();
    for n in 0..5 {
        let mut prior = attempt(
            Some("u-1"),
            &format!("198.51.100.{n}"),
            start + Duration::seconds(3 * n),
        );
        prior.event_id = EventId::new(format!("e-{n}"));
        h.ledger.seed(prior);
    }
    h.clock.set(start + Duration::seconds(20));

    assert!(h.guard.screen(&intent(Some("u-1"), "192.0.2.50")).await.is_allowed());
}

// ============================================================================
// Chain order and reporting
// ============================================================================

#[tokio::test]
async fn test_first_failing_stage_wins() {
    let h = harness();
    h.blacklist.block(BlacklistEntry {
        kind: BlacklistKind::User,
        value: "u-1".into(),
        reason: "chargebacks".into(),
        expires_at: None,
    });
    let start = test_epoch();
    for n in 0..10 {
        h.ledger
            .seed(attempt(Some("u-1"), "198.51.100.1", start + Duration::seconds(n)));
    }
    h.clock.set(start + Duration::seconds(20));

    let decision = h.guard.screen(&intent(Some("u-1"), "198.51.100.1")).await;

    assert_eq!(stage(&decision), Some(FraudStage::Blacklist));
}

#[tokio::test]
async fn test_reported_critical_activity_alerts() {
    let h = harness();

    h.guard.report_activity(SuspiciousActivity {
        user_id: Some(UserId::new("u-1")),
        activity_type: ActivityType::MultipleAccounts,
        severity: Severity::Critical,
        ip_address: "198.51.100.1".into(),
        metadata: serde_json::json!({ "linked_accounts": 12 }),
        detected_at: test_epoch(),
    });

    assert_eq!(h.audit.records().len(), 1);
    assert_eq!(h.alerts.alerts().len(), 1);
}

#[tokio::test]
async fn test_ticket_store_outage_fails_open() {
    let h = harness();
    h.tickets.set_unavailable(true);

    let decision = h.guard.screen(&intent(Some("u-1"), "198.51.100.1")).await;

    assert_eq!(
        decision,
        FraudDecision::Allowed {
            remaining_allowance: None
        }
    );
}
