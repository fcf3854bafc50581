use reqwest::StatusCode;
use thiserror::Error;

/// Failure at the fetch boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    BaseUrl(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
