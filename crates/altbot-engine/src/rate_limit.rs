use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Fixed-window request counter shared by every user.
///
/// All counters are zeroed together by [`RateLimiter::reset_all`], which the
/// maintenance task calls once per window.
pub struct RateLimiter {
    max_per_window: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            max_per_window,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `user`. Returns `false` (without counting) once
    /// the user is at the cap.
    pub fn increment(&self, user: &str) -> bool {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let count = counts.entry(user.to_string()).or_insert(0);
        if *count >= self.max_per_window {
            return false;
        }
        *count += 1;
        true
    }

    pub fn reset_all(&self) {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn count(&self, user: &str) -> u32 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .copied()
            .unwrap_or(0)
    }
}
