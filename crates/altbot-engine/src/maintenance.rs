use std::sync::Arc;
use std::time::Duration;

use altbot_core::config::{RATE_WINDOW_SECS, REPLY_RETENTION_SECS, REPLY_SWEEP_INTERVAL_SECS};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::consent::ConsentStore;
use crate::rate_limit::RateLimiter;
use crate::tracker::ReplyTracker;

/// Timer-driven housekeeping: rate-window resets, reply-record sweeps and
/// optional consent expiry.
pub struct Maintenance {
    limiter: Arc<RateLimiter>,
    tracker: Arc<ReplyTracker>,
    consent: Arc<ConsentStore>,
    rate_window: Duration,
    sweep_every: Duration,
    retention: chrono::Duration,
    consent_timeout: Option<chrono::Duration>,
}

impl Maintenance {
    pub fn new(
        limiter: Arc<RateLimiter>,
        tracker: Arc<ReplyTracker>,
        consent: Arc<ConsentStore>,
    ) -> Self {
        Self {
            limiter,
            tracker,
            consent,
            rate_window: Duration::from_secs(RATE_WINDOW_SECS),
            sweep_every: Duration::from_secs(REPLY_SWEEP_INTERVAL_SECS),
            retention: chrono::Duration::seconds(REPLY_RETENTION_SECS),
            consent_timeout: None,
        }
    }

    /// Expire consent requests after `minutes`; 0 keeps them until answered.
    pub fn with_consent_timeout(mut self, minutes: u64) -> Self {
        self.consent_timeout = match minutes {
            0 => None,
            m => Some(chrono::Duration::minutes(m as i64)),
        };
        self
    }

    pub fn with_intervals(mut self, rate_window: Duration, sweep_every: Duration) -> Self {
        self.rate_window = rate_window;
        self.sweep_every = sweep_every;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            rate_window_secs = self.rate_window.as_secs(),
            sweep_secs = self.sweep_every.as_secs(),
            "maintenance started"
        );

        let mut rate_tick = tokio::time::interval(self.rate_window);
        let mut sweep_tick = tokio::time::interval(self.sweep_every);
        // Both intervals fire immediately; skip that first tick.
        rate_tick.tick().await;
        sweep_tick.tick().await;

        loop {
            tokio::select! {
                _ = rate_tick.tick() => {
                    self.limiter.reset_all();
                    debug!("rate limit window reset");
                }
                _ = sweep_tick.tick() => self.sweep(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("maintenance shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn sweep(&self) {
        let now = Utc::now();
        let removed = self.tracker.sweep(now, self.retention);
        if removed > 0 {
            info!(removed, remaining = self.tracker.len(), "swept old reply records");
        }

        if let Some(timeout) = self.consent_timeout {
            let expired = self.consent.expire(now, timeout);
            if expired > 0 {
                info!(expired, "expired stale consent requests");
            }
        }
    }
}
