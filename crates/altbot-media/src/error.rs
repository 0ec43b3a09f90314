use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// Network or body-read failure.
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("remote returned HTTP {0}")]
    Status(u16),

    #[error("file size {size} bytes exceeds maximum of {max} bytes")]
    SizeExceeded { size: u64, max: u64 },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn is_size_exceeded(&self) -> bool {
        matches!(self, MediaError::SizeExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
