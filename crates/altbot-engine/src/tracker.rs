use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use altbot_social::{SocialClient, StatusId};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRecord {
    pub reply_id: StatusId,
    pub created_at: DateTime<Utc>,
}

/// Links each described post to the reply generated for it, so the reply can
/// be removed when the post is deleted.
#[derive(Default)]
pub struct ReplyTracker {
    records: Mutex<HashMap<StatusId, ReplyRecord>>,
}

impl ReplyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `reply` as the generated reply for `original`, replacing any earlier one.
    pub fn record(&self, original: StatusId, reply: StatusId, now: DateTime<Utc>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                original,
                ReplyRecord {
                    reply_id: reply,
                    created_at: now,
                },
            );
    }

    pub fn get(&self, original: &StatusId) -> Option<ReplyRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(original)
            .cloned()
    }

    /// Delete the reply generated for `original`, if any.
    ///
    /// The record is dropped before the upstream call and stays dropped even
    /// when that call fails. Returns whether `original` was tracked.
    pub async fn cascade_delete(&self, original: &StatusId, client: &dyn SocialClient) -> bool {
        let record = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(original);

        let Some(record) = record else {
            return false;
        };

        match client.delete_post(&record.reply_id).await {
            Ok(()) => info!(
                original_id = %original,
                reply_id = %record.reply_id,
                "deleted reply for deleted post"
            ),
            Err(e) => warn!(
                original_id = %original,
                reply_id = %record.reply_id,
                error = %e,
                "failed to delete reply for deleted post"
            ),
        }
        true
    }

    /// Forget records older than `retention`. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, r| now - r.created_at <= retention);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
