use altbot_core::config::DniConfig;
use altbot_core::AltbotConfig;
use altbot_social::Visibility;
use tracing::warn;

/// The slice of configuration the engine acts on.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bot account name, for self-detection and the reply trailer.
    pub bot_username: String,
    /// Intended reply visibility; `None` replies with the target's own visibility.
    pub reply_visibility: Option<Visibility>,
    pub ask_for_consent: bool,
    pub follow_back: bool,
    pub downscale_width: u32,
    pub max_size_bytes: u64,
    pub max_requests_per_minute: u32,
    /// 0 keeps consent requests until answered.
    pub consent_timeout_minutes: u64,
    pub dni: DniConfig,
}

impl EngineSettings {
    pub fn from_config(config: &AltbotConfig) -> Self {
        let reply_visibility = match config.behavior.reply_visibility.parse::<Visibility>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "reply_visibility not recognized, replies follow the target post");
                None
            }
        };

        Self {
            bot_username: config.server.username.clone(),
            reply_visibility,
            ask_for_consent: config.behavior.ask_for_consent,
            follow_back: config.behavior.follow_back,
            downscale_width: config.image_processing.downscale_width,
            max_size_bytes: config.image_processing.max_size_bytes(),
            max_requests_per_minute: config.image_processing.max_requests_per_user_per_minute,
            consent_timeout_minutes: config.behavior.consent_timeout_minutes,
            dni: config.dni.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bot_username: "altbot".to_string(),
            reply_visibility: Some(Visibility::Unlisted),
            ask_for_consent: true,
            follow_back: false,
            downscale_width: 800,
            max_size_bytes: 10 * 1024 * 1024,
            max_requests_per_minute: 5,
            consent_timeout_minutes: 0,
            dni: DniConfig::default(),
        }
    }
}
