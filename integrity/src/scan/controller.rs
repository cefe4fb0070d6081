//! Runtime wrapper that drives the scanner reducer.

use super::reducer::{ScanAction, ScanEnvironment, ScanOutcome, ScanReducer, ScanState};
use std::time::Duration;
use ticket_integrity_runtime::{Store, StoreError};

/// Store running the scanner state machine
pub type ScanStore = Store<ScanState, ScanAction, ScanEnvironment, ScanReducer>;

/// What became of a submitted code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanReply {
    /// Not a ticket code, a repeat read, or the scanner was busy
    Ignored,
    /// The check-in returned and its result is on screen
    Completed(ScanOutcome),
    /// The check-in call failed; the scanner is ready again
    Failed(String),
}

/// One scanning device.
///
/// Cloning is cheap and clones drive the same device.
#[derive(Clone)]
pub struct ScanController {
    store: ScanStore,
}

impl ScanController {
    /// Start a scanner in the ready state
    #[must_use]
    pub fn new(environment: ScanEnvironment) -> Self {
        Self {
            store: Store::new(ScanState::default(), ScanReducer::new(), environment),
        }
    }

    /// Feed a decoded camera payload.
    ///
    /// Returns once the scan has been accepted or ignored; the check-in runs
    /// in the background.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`ScanController::shutdown`].
    pub async fn handle_scan(&self, raw: impl Into<String>) -> Result<(), StoreError> {
        self.store.send(ScanAction::Scan { raw: raw.into() }).await
    }

    /// Feed a code typed by staff.
    ///
    /// The trimmed text is the ticket identifier; it is not decoded like a
    /// camera payload. Duplicate and in-flight guards still apply.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`ScanController::shutdown`].
    pub async fn manual_entry(&self, code: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(ScanAction::ManualEntry { code: code.into() })
            .await
    }

    /// Clear any result and return to scanning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`ScanController::shutdown`].
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.send(ScanAction::Reset).await
    }

    /// Submit a scan or manual entry and wait for its check-in to finish.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: the check-in did not return within `timeout`
    /// - [`StoreError::ShutdownInProgress`]: the scanner is shutting down
    pub async fn submit_and_wait(&self, action: ScanAction, timeout: Duration) -> Result<ScanReply, StoreError> {
        let mut actions = self.store.subscribe();
        let before = self.store.state(|state| state.generation).await;
        self.store.send(action).await?;
        let generation = self.store.state(|state| state.generation).await;
        if generation == before {
            return Ok(ScanReply::Ignored);
        }

        tokio::time::timeout(timeout, async {
            loop {
                match actions.recv().await {
                    Ok(ScanAction::CheckInCompleted {
                        generation: finished,
                        ticket_id,
                        result,
                    }) if finished == generation => {
                        return Ok(ScanReply::Completed(ScanOutcome { ticket_id, result }));
                    },
                    Ok(ScanAction::CheckInFailed {
                        generation: finished,
                        error,
                        ..
                    }) if finished == generation => return Ok(ScanReply::Failed(error)),
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {},
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Current scanner state
    pub async fn snapshot(&self) -> ScanState {
        self.store.state(Clone::clone).await
    }

    /// Check-in calls and timers still running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.store.pending_effects()
    }

    /// Tear the scanner down.
    ///
    /// Cancels the cooldown timer. An in-flight check-in runs to completion
    /// but its result is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the in-flight check-in has
    /// not returned within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        // Already shutting down is fine; the store rejects the reset
        let _ = self.store.send(ScanAction::Reset).await;
        self.store.shutdown(timeout).await
    }
}
