//! In-memory purchase ledger.

use crate::error::Result;
use crate::providers::PurchaseLedger;
use crate::types::{EventId, PurchaseAttempt, UserId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory purchase ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchaseLedger {
    attempts: Arc<Mutex<Vec<PurchaseAttempt>>>,
}

impl InMemoryPurchaseLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a historical attempt directly.
    pub fn seed(&self, attempt: PurchaseAttempt) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attempt);
    }

    /// Every recorded attempt, oldest first.
    #[must_use]
    pub fn attempts(&self) -> Vec<PurchaseAttempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count_where(&self, predicate: impl Fn(&PurchaseAttempt) -> bool) -> u32 {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let count = attempts.iter().filter(|attempt| predicate(attempt)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

impl PurchaseLedger for InMemoryPurchaseLedger {
    async fn record(&self, attempt: PurchaseAttempt) -> Result<()> {
        self.seed(attempt);
        Ok(())
    }

    async fn count_for_user_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<u32> {
        Ok(self.count_where(|attempt| {
            attempt.user_id.as_ref() == Some(user_id) && attempt.attempted_at >= since
        }))
    }

    async fn count_for_ip_since(&self, ip_address: &str, since: DateTime<Utc>) -> Result<u32> {
        Ok(self.count_where(|attempt| {
            attempt.ip_address == ip_address && attempt.attempted_at >= since
        }))
    }

    async fn count_for_event_ip_since(
        &self,
        event_id: &EventId,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        Ok(self.count_where(|attempt| {
            &attempt.event_id == event_id
                && attempt.ip_address == ip_address
                && attempt.attempted_at >= since
        }))
    }

    async fn distinct_ips_for_fingerprint_since(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let ips: BTreeSet<String> = attempts
            .iter()
            .filter(|attempt| {
                attempt.fingerprint.as_deref() == Some(fingerprint) && attempt.attempted_at >= since
            })
            .map(|attempt| attempt.ip_address.clone())
            .collect();
        Ok(ips.into_iter().collect())
    }

    async fn recent_attempt_times_for_user(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut times: Vec<DateTime<Utc>> = attempts
            .iter()
            .filter(|attempt| attempt.user_id.as_ref() == Some(user_id) && attempt.attempted_at >= since)
            .map(|attempt| attempt.attempted_at)
            .collect();
        times.sort_unstable_by(|a, b| b.cmp(a));
        times.truncate(limit);
        Ok(times)
    }
}
