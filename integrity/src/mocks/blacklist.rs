//! In-memory blacklist.

use crate::error::Result;
use crate::providers::Blacklist;
use crate::types::{BlacklistEntry, BlacklistKind};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory blacklist.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlacklist {
    entries: Arc<Mutex<Vec<BlacklistEntry>>>,
}

impl InMemoryBlacklist {
    /// Create an empty blacklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry synchronously.
    pub fn block(&self, entry: BlacklistEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|existing| !(existing.kind == entry.kind && existing.value == entry.value));
        entries.push(entry);
    }
}

impl Blacklist for InMemoryBlacklist {
    async fn find_active(
        &self,
        kind: BlacklistKind,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BlacklistEntry>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .find(|entry| entry.kind == kind && entry.value == value && entry.is_active(now))
            .cloned())
    }

    async fn add(&self, entry: BlacklistEntry) -> Result<()> {
        self.block(entry);
        Ok(())
    }
}
