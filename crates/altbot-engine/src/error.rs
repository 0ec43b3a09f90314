use altbot_agent::ProviderError;
use altbot_media::MediaError;
use thiserror::Error;

/// Why one attachment could not be described.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("media: {0}")]
    Media(#[from] MediaError),

    #[error("backend: {0}")]
    Provider(#[from] ProviderError),

    #[error("task failed: {0}")]
    Task(String),
}

impl EngineError {
    /// Localized response key shown in place of a description.
    pub fn response_key(&self) -> &'static str {
        match self {
            EngineError::Media(e) if e.is_size_exceeded() => "fileTooLarge",
            _ => "altTextError",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
