//! Blocked users, IP addresses and emails.

use crate::error::Result;
use crate::types::{BlacklistEntry, BlacklistKind};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Blacklist storage.
pub trait Blacklist: Send + Sync {
    /// The entry blocking `value` at `now`, if any.
    ///
    /// Entries whose `expires_at` is before `now` are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the blacklist cannot be read.
    fn find_active(
        &self,
        kind: BlacklistKind,
        value: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<BlacklistEntry>>> + Send;

    /// Add or replace an entry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry cannot be stored.
    fn add(&self, entry: BlacklistEntry) -> impl Future<Output = Result<()>> + Send;
}
