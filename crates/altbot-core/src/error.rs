use thiserror::Error;

#[derive(Debug, Error)]
pub enum AltbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Localization error: {0}")]
    Localization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AltbotError {
    /// Short error code string used in startup diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            AltbotError::Config(_) => "CONFIG_ERROR",
            AltbotError::Localization(_) => "LOCALIZATION_ERROR",
            AltbotError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AltbotError>;
