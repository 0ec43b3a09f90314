use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Non-image media handed to a backend as a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Audio,
}

impl FileKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Video => "video/mp4",
            FileKind::Audio => "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Video => "mp4",
            FileKind::Audio => "mp3",
        }
    }

    /// Prompt key in the localization catalog.
    pub fn prompt_key(&self) -> &'static str {
        match self {
            FileKind::Video => "generateVideoAltText",
            FileKind::Audio => "generateAudioAltText",
        }
    }

    /// How long to wait between upload-state polls. Audio takes longer to process.
    pub fn default_poll_interval(&self) -> Duration {
        match self {
            FileKind::Video => Duration::from_secs(1),
            FileKind::Audio => Duration::from_secs(10),
        }
    }
}

/// Common interface for the hosted and local alt-text backends.
#[async_trait]
pub trait AltTextBackend: Send + Sync {
    /// Provider name for logging and the reply trailer.
    fn name(&self) -> &str;

    /// Whether video and audio can be described.
    fn supports_media_files(&self) -> bool;

    /// Describe an encoded image (`mime_type` is `image/png` or `image/jpeg`).
    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError>;

    /// Describe a media file already on disk.
    async fn generate_from_file(
        &self,
        prompt: &str,
        path: &Path,
        kind: FileKind,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported by this provider: {0}")]
    Unsupported(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
