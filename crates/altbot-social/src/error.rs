use thiserror::Error;

/// Errors surfaced by a social-platform client.
#[derive(Debug, Error)]
pub enum SocialError {
    /// The streaming transport could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request never produced an HTTP response.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Status not found: {id}")]
    NotFound { id: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The access token was rejected.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
}
