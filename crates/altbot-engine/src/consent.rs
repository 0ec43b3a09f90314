//! Pending consent requests, keyed by the post whose media would be described.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use altbot_social::StatusId;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// The mention that asked for descriptions.
    pub mention_id: StatusId,
    /// Who asked.
    pub requester: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ConsentStore {
    pending: Mutex<HashMap<StatusId, ConsentRequest>>,
}

impl ConsentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a request for `original`. Returns `false` if one is already pending.
    pub fn open(&self, original: &StatusId, request: ConsentRequest) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.contains_key(original) {
            return false;
        }
        pending.insert(original.clone(), request);
        true
    }

    pub fn pending(&self, original: &StatusId) -> Option<ConsentRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(original)
            .cloned()
    }

    /// Remove and return the request; called once an answer arrives, whatever it says.
    pub fn resolve(&self, original: &StatusId) -> Option<ConsentRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(original)
    }

    /// Drop requests older than `max_age`. Returns how many were dropped.
    pub fn expire(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let before = pending.len();
        pending.retain(|_, req| now - req.requested_at <= max_age);
        before - pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a consent answer reads as "yes".
///
/// Mentions (`@altbot`) are dropped first, then any remaining `y` counts.
pub fn is_affirmative(answer: &str) -> bool {
    answer
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !word.starts_with('@'))
        .any(|word| word.contains('y'))
}
