use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value for {name}")]
    InvalidHeader { name: String },

    #[error("Request editor failed: {0}")]
    EditorError(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Login failed (HTTP {status}): {message}")]
    LoginFailed { status: u16, message: String },

    #[error("Failed to encode request body: {0}")]
    EncodeError(#[from] serde_json::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}
