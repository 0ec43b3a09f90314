//! Reply orchestration: classifies stream events, gates on consent and rate
//! limits, fans out per-attachment description work, publishes one reply per
//! post and removes it again when the post is deleted.

pub mod consent;
pub mod dispatcher;
pub mod dni;
pub mod error;
pub mod maintenance;
pub mod processor;
pub mod rate_limit;
pub mod settings;
pub mod tracker;
pub mod visibility;

use std::sync::Arc;

use altbot_agent::Invoker;
use altbot_core::Localizer;
use altbot_social::SocialClient;

pub use consent::ConsentStore;
pub use dispatcher::Dispatcher;
pub use error::EngineError;
pub use maintenance::Maintenance;
pub use processor::AttachmentProcessor;
pub use rate_limit::RateLimiter;
pub use settings::EngineSettings;
pub use tracker::ReplyTracker;

/// The wired engine: a dispatcher and its maintenance task sharing one set of stores.
pub struct Engine {
    pub dispatcher: Dispatcher,
    pub maintenance: Maintenance,
    pub consent: Arc<ConsentStore>,
    pub tracker: Arc<ReplyTracker>,
    pub limiter: Arc<RateLimiter>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        client: Arc<dyn SocialClient>,
        invoker: Invoker,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        let settings = Arc::new(settings);
        let limiter = Arc::new(RateLimiter::new(settings.max_requests_per_minute));
        let tracker = Arc::new(ReplyTracker::new());
        let consent = Arc::new(ConsentStore::new());

        let processor = AttachmentProcessor::new(
            client.clone(),
            invoker,
            localizer.clone(),
            limiter.clone(),
            tracker.clone(),
            settings.clone(),
        );
        let dispatcher = Dispatcher::new(
            client,
            processor,
            consent.clone(),
            tracker.clone(),
            localizer,
            settings.clone(),
        );
        let maintenance = Maintenance::new(limiter.clone(), tracker.clone(), consent.clone())
            .with_consent_timeout(settings.consent_timeout_minutes);

        Self {
            dispatcher,
            maintenance,
            consent,
            tracker,
            limiter,
        }
    }
}
