use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const PLACEHOLDER_SERVER: &str = "https://mastodon.example.com";

pub const RATE_WINDOW_SECS: u64 = 60; // rate-limit counters reset every minute
pub const REPLY_SWEEP_INTERVAL_SECS: u64 = 10 * 60;
pub const REPLY_RETENTION_SECS: i64 = 60 * 60;

/// Top-level config (config.toml + ALTBOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltbotConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub safety_settings: SafetySettings,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub dni: DniConfig,
    #[serde(default)]
    pub image_processing: ImageProcessingConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub mastodon_server: String,
    #[serde(default)]
    pub access_token: String,
    /// The bot's own account name, used for DNI self-checks and the reply trailer.
    pub username: String,
}

/// Which alt-text backend to use. Selected once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    Ollama,
}

impl LlmProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => "gemini",
            LlmProviderKind::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    /// Executable used for the local backend.
    #[serde(default = "default_ollama_command")]
    pub ollama_command: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            ollama_model: default_ollama_model(),
            ollama_command: default_ollama_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: i32,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            base_url: default_gemini_base_url(),
        }
    }
}

/// Hosted-model content filter thresholds: `none`, `low`, `medium` or `high`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SafetySettings {
    #[serde(default)]
    pub harassment_threshold: String,
    #[serde(default)]
    pub hate_speech_threshold: String,
    #[serde(default)]
    pub sexually_explicit_threshold: String,
    #[serde(default)]
    pub dangerous_content_threshold: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Optional JSON catalog merged over the built-in strings.
    pub path: Option<String>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            path: None,
        }
    }
}

/// Do-not-interact rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DniConfig {
    /// Substrings of an account bio that opt the account out.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ignore_bots: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageProcessingConfig {
    #[serde(default = "default_downscale_width")]
    pub downscale_width: u32,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests_per_user_per_minute: u32,
}

impl ImageProcessingConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ImageProcessingConfig {
    fn default() -> Self {
        Self {
            downscale_width: default_downscale_width(),
            max_size_mb: default_max_size_mb(),
            max_requests_per_user_per_minute: default_max_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Intended reply visibility: public, unlisted, private or direct.
    #[serde(default = "default_reply_visibility")]
    pub reply_visibility: String,
    #[serde(default)]
    pub follow_back: bool,
    #[serde(default = "bool_true")]
    pub ask_for_consent: bool,
    /// Pending consent requests older than this are dropped. 0 = never expire.
    #[serde(default)]
    pub consent_timeout_minutes: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            reply_visibility: default_reply_visibility(),
            follow_back: false,
            ask_for_consent: true,
            consent_timeout_minutes: 0,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_ollama_model() -> String {
    "llava-phi3".to_string()
}
fn default_ollama_command() -> String {
    "ollama".to_string()
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> i32 {
    1
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_downscale_width() -> u32 {
    800
}
fn default_max_size_mb() -> u64 {
    10
}
fn default_max_requests() -> u32 {
    5
}
fn default_reply_visibility() -> String {
    "unlisted".to_string()
}

impl AltbotConfig {
    /// Load config from a TOML file with ALTBOT_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `ALTBOT_GEMINI__API_KEY`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let config: AltbotConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ALTBOT_").split("__"))
            .extract()
            .map_err(|e| crate::error::AltbotError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configs that cannot possibly connect anywhere.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AltbotError;

        let server = self.server.mastodon_server.trim_end_matches('/');
        if server.is_empty() || server == PLACEHOLDER_SERVER {
            return Err(AltbotError::Config(
                "please configure server.mastodon_server in config.toml".into(),
            ));
        }
        if self.server.access_token.is_empty() {
            return Err(AltbotError::Config("server.access_token is empty".into()));
        }
        if self.server.username.is_empty() {
            return Err(AltbotError::Config("server.username is empty".into()));
        }
        if self.llm.provider == LlmProviderKind::Gemini && self.gemini.api_key.is_empty() {
            return Err(AltbotError::Config(
                "gemini.api_key is required when llm.provider = \"gemini\"".into(),
            ));
        }
        Ok(())
    }
}
