//! Append-only purchase attempt ledger.

use crate::error::Result;
use crate::types::{EventId, PurchaseAttempt, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Purchase attempt history used by the rate limiter and bot detection.
///
/// All windowed queries include attempts made exactly at `since`.
pub trait PurchaseLedger: Send + Sync {
    /// Append an attempt.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt cannot be stored.
    fn record(&self, attempt: PurchaseAttempt) -> impl Future<Output = Result<()>> + Send;

    /// Attempts by a user since `since`.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read.
    fn count_for_user_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Attempts from an IP address since `since`.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read.
    fn count_for_ip_since(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Attempts for an event from an IP address since `since`.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read.
    fn count_for_event_ip_since(
        &self,
        event_id: &EventId,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Distinct IP addresses seen with a device fingerprint since `since`.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read.
    fn distinct_ips_for_fingerprint_since(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Times of a user's most recent attempts since `since`, newest first,
    /// at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read.
    fn recent_attempt_times_for_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send;
}
