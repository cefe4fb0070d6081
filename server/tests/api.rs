//! HTTP API tests against in-memory storage.
//!
//! Run with: `cargo test -p ticket-integrity-server --test api`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use ticket_integrity::config::IntegrityConfig;
use ticket_integrity::types::{ActivityType, Severity, Ticket, TicketStatus};
use ticket_integrity_server::{AppState, CORRELATION_ID_HEADER, MemoryStores, build_router};
use ticket_integrity_testing::test_clock;
use tower::ServiceExt;

fn app(stores: &MemoryStores) -> Router {
    build_router(AppState::in_memory(
        stores.clone(),
        Arc::new(test_clock()),
        &IntegrityConfig::default(),
    ))
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_from(app, uri, body, None).await
}

async fn post_from(app: &Router, uri: &str, body: Value, forwarded_for: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(ip) = forwarded_for {
        request = request.header("X-Forwarded-For", ip);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

fn gate(ticket_id: &str) -> Value {
    json!({ "ticket_id": ticket_id, "entry_point": "north-gate", "scanned_by": "staff-1" })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app(&MemoryStores::default());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_in_then_duplicate() {
    let stores = MemoryStores::default();
    stores
        .tickets
        .insert(
            Ticket::new("abc123", "e-1", TicketStatus::Confirmed)
                .with_attendee("u-1")
                .with_ticket_type("VIP", 2),
        )
        .await;
    stores.directory.insert("u-1", "Ada Lovelace");
    let app = app(&stores);

    let (status, body) = post(&app, "/api/events/e-1/check-ins", gate("abc123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "VALID");
    assert_eq!(body["attendee_name"], "Ada Lovelace");
    assert_eq!(body["ticket_type"], "VIP");
    assert_eq!(body["quantity"], 2);

    let (status, body) = post(
        &app,
        "/api/events/e-1/check-ins",
        json!({ "ticket_id": "abc123", "entry_point": "south-gate", "scanned_by": "staff-2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ALREADY_CHECKED_IN");
    assert_eq!(body["entry_point"], "north-gate");
    assert_eq!(body["allow_reentry"], false);
}

#[tokio::test]
async fn test_check_in_refusals_are_ok_responses() {
    let stores = MemoryStores::default();
    stores
        .tickets
        .insert(Ticket::new("refunded-1", "e-1", TicketStatus::Refunded))
        .await;
    let app = app(&stores);

    let (status, body) = post(&app, "/api/events/e-1/check-ins", gate("missing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "INVALID", "reason": "NOT_FOUND" }));

    let (_, body) = post(&app, "/api/events/e-1/check-ins", gate("refunded-1")).await;
    assert_eq!(body["reason"], "REFUNDED");

    let (_, body) = post(&app, "/api/events/e-2/check-ins", gate("refunded-1")).await;
    assert_eq!(body["reason"], "WRONG_EVENT");
}

#[tokio::test]
async fn test_check_in_rejects_blank_fields() {
    let app = app(&MemoryStores::default());

    let (status, body) = post(&app, "/api/events/e-1/check-ins", gate("  ")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_override_readmits_checked_in_ticket() {
    let stores = MemoryStores::default();
    stores
        .tickets
        .insert(Ticket::new("abc123", "e-1", TicketStatus::Confirmed))
        .await;
    let app = app(&stores);

    post(&app, "/api/events/e-1/check-ins", gate("abc123")).await;

    let mut body = gate("abc123");
    body["authorized_by"] = json!("supervisor-1");
    let (status, result) = post(&app, "/api/events/e-1/check-ins/override", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "VALID");
    assert_eq!(result["attendee_name"], "Guest");

    let stored = stores.tickets.get_ticket("abc123").await.unwrap();
    assert!(stored.reentry_override);
    assert_eq!(stored.scanned_count, 2);

    let mut body = gate("abc123");
    body["authorized_by"] = json!("");
    let (status, _) = post(&app, "/api/events/e-1/check-ins/override", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_screen_uses_forwarded_ip() {
    let stores = MemoryStores::default();
    let app = app(&stores);

    let (status, body) = post_from(
        &app,
        "/api/purchases/screen",
        json!({ "user_id": "u-1", "event_id": "e-1", "quantity": 2 }),
        Some("203.0.113.9"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "decision": "allowed", "remaining_allowance": 10 }));

    let attempts = stores.ledger.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].ip_address, "203.0.113.9");
    assert!(attempts[0].success);
}

#[tokio::test]
async fn test_blacklisted_ip_is_denied() {
    let stores = MemoryStores::default();
    let app = app(&stores);

    let (status, _) = post(
        &app,
        "/api/blacklist",
        json!({ "kind": "ip", "value": "198.51.100.7", "reason": "card testing" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(
        &app,
        "/api/purchases/screen",
        json!({ "event_id": "e-1", "quantity": 1, "ip_address": "198.51.100.7" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"], "denied");
    assert_eq!(body["stage"], "blacklist");
    assert!(!body["reason"].as_str().unwrap().contains("card testing"));

    assert!(!stores.ledger.attempts()[0].success);
    assert_eq!(stores.audit.records()[0].activity_type, ActivityType::Blacklisted);
}

#[tokio::test]
async fn test_screen_rejects_zero_quantity() {
    let app = app(&MemoryStores::default());

    let (status, _) = post(
        &app,
        "/api/purchases/screen",
        json!({ "event_id": "e-1", "quantity": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_report_activity_is_recorded() {
    let stores = MemoryStores::default();
    let app = app(&stores);

    let (status, _) = post_from(
        &app,
        "/api/activity",
        json!({
            "user_id": "u-9",
            "activity_type": "multiple_accounts",
            "severity": "critical",
            "metadata": { "linked_accounts": 4 }
        }),
        Some("192.0.2.44"),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let records = stores.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].activity_type, ActivityType::MultipleAccounts);
    assert_eq!(records[0].severity, Severity::Critical);
    assert_eq!(records[0].ip_address, "192.0.2.44");
    assert_eq!(records[0].metadata["linked_accounts"], 4);
}
