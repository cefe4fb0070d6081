//! In-memory attendee directory and event policy.

use crate::error::Result;
use crate::providers::{AttendeeDirectory, EventPolicy};
use crate::types::{EventId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory attendee directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttendeeDirectory {
    names: Arc<Mutex<HashMap<UserId, String>>>,
}

impl InMemoryAttendeeDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name.
    pub fn insert(&self, user_id: impl Into<UserId>, name: impl Into<String>) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.into(), name.into());
    }
}

impl AttendeeDirectory for InMemoryAttendeeDirectory {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>> {
        Ok(self
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned())
    }
}

/// In-memory event policy. Events default to no re-entry and no explicit cap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPolicy {
    caps: Arc<Mutex<HashMap<EventId, u32>>>,
    reentry: Arc<Mutex<HashSet<EventId>>>,
}

impl InMemoryEventPolicy {
    /// Create a policy with no per-event settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an event's per-user ticket cap.
    pub fn set_max_tickets(&self, event_id: impl Into<EventId>, cap: u32) {
        self.caps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_id.into(), cap);
    }

    /// Allow or forbid re-entry for an event.
    pub fn set_allow_reentry(&self, event_id: impl Into<EventId>, allowed: bool) {
        let mut reentry = self.reentry.lock().unwrap_or_else(PoisonError::into_inner);
        let event_id = event_id.into();
        if allowed {
            reentry.insert(event_id);
        } else {
            reentry.remove(&event_id);
        }
    }
}

impl EventPolicy for InMemoryEventPolicy {
    async fn max_tickets_per_user(&self, event_id: &EventId) -> Result<Option<u32>> {
        Ok(self
            .caps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_id)
            .copied())
    }

    async fn allow_reentry(&self, event_id: &EventId) -> Result<bool> {
        Ok(self
            .reentry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(event_id))
    }
}
