//! Gate scanner console.
//!
//! Reads one camera payload per line from stdin and checks it in through the
//! HTTP API, printing a result card for each admitted or refused ticket.
//!
//! ```text
//! :manual <code>   check in a code typed by staff
//! :reset           clear the result and scan again
//! :quit            exit
//! ```
//!
//! # Usage
//!
//! ```bash
//! CHECKIN_API_URL=http://localhost:8080 EVENT_ID=e-1 ENTRY_POINT=north-gate \
//!     STAFF_ID=staff-7 cargo run --bin scanner
//! ```

use anyhow::Context;
use std::env;
use std::sync::Arc;
use ticket_integrity::config::ScanConfig;
use ticket_integrity::scan::{ScanAction, ScanController, ScanEnvironment};
use ticket_integrity::types::EventId;
use ticket_integrity_core::environment::SystemClock;
use ticket_integrity_server::HttpCheckInHandler;
use ticket_integrity_server::console::{CALL_TIMEOUT, WAIT_TIMEOUT, render_reply};
use ticket_integrity_server::telemetry::init_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing("warn,ticket_integrity=info");

    let base_url = env::var("CHECKIN_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let event_id = EventId::new(env::var("EVENT_ID").context("EVENT_ID must be set")?);
    let entry_point = env::var("ENTRY_POINT").unwrap_or_else(|_| "main-gate".to_string());
    let staff_id = env::var("STAFF_ID").unwrap_or_else(|_| "scanner".to_string());

    let handler = HttpCheckInHandler::new(&base_url, &event_id, entry_point.as_str(), staff_id, CALL_TIMEOUT)
        .context("Failed to build HTTP client")?;
    let scanner = ScanController::new(ScanEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(handler),
        ScanConfig::from_env(),
    ));

    println!("Scanning for event {event_id} at {entry_point}. Type :quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let action = match line.split_once(' ') {
            _ if line.is_empty() => continue,
            _ if line == ":quit" => break,
            _ if line == ":reset" => {
                scanner.reset().await?;
                println!("Ready.");
                continue;
            },
            Some((":manual", code)) => ScanAction::ManualEntry {
                code: code.trim().to_string(),
            },
            _ => ScanAction::Scan {
                raw: line.to_string(),
            },
        };

        let reply = scanner.submit_and_wait(action, WAIT_TIMEOUT).await;
        println!("{}", render_reply(reply)?);
    }

    scanner.shutdown(CALL_TIMEOUT).await?;
    Ok(())
}
