//! Check-in callback that calls the HTTP API.
//!
//! Lets a gate scanner run on a different machine from the ticket store.

use crate::handlers::check_in::CheckInBody;
use crate::middleware::CORRELATION_ID_HEADER;
use futures::future::BoxFuture;
use std::time::Duration;
use ticket_integrity::checkin::CheckInResult;
use ticket_integrity::error::ScanError;
use ticket_integrity::providers::CheckInHandler;
use ticket_integrity::types::{EventId, TicketId};
use uuid::Uuid;

/// Checks tickets in through `POST /api/events/:event_id/check-ins`.
#[derive(Clone)]
pub struct HttpCheckInHandler {
    client: reqwest::Client,
    endpoint: String,
    entry_point: String,
    scanned_by: String,
}

impl HttpCheckInHandler {
    /// A handler for one gate of one event.
    ///
    /// `base_url` is the API root, e.g. `http://checkin.internal:8080`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        event_id: &EventId,
        entry_point: impl Into<String>,
        scanned_by: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/api/events/{}/check-ins",
                base_url.trim_end_matches('/'),
                event_id
            ),
            entry_point: entry_point.into(),
            scanned_by: scanned_by.into(),
        })
    }

    /// URL check-ins are posted to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CheckInHandler for HttpCheckInHandler {
    fn check_in(&self, ticket_id: TicketId) -> BoxFuture<'static, Result<CheckInResult, ScanError>> {
        let request = self
            .client
            .post(&self.endpoint)
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .json(&CheckInBody {
                ticket_id: ticket_id.into_inner(),
                entry_point: self.entry_point.clone(),
                scanned_by: self.scanned_by.clone(),
            });

        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| ScanError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ScanError::Service {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<CheckInResult>()
                .await
                .map_err(|e| ScanError::Transport(format!("Unreadable check-in response: {e}")))
        })
    }
}
