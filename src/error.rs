use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when using the multi-ai-handler library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not detect MIME type from filename '{0}'")]
    UnknownMimeType(String),

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    /// A locally hosted inference server could not be reached or is failing.
    #[error("{reason} at {location}. {hint}")]
    ServerUnavailable {
        location: String,
        reason: String,
        hint: String,
    },

    #[error("Could not extract JSON from model response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Document extraction failed: {0}")]
    Extraction(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Error::Extraction(message.into())
    }

    /// Map a non-success vendor HTTP status to an error.
    pub fn from_status(provider: &str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Auth(format!("{provider}: {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
            _ => Error::provider(provider, format!("API error ({status}): {body}")),
        }
    }
}

/// Read the body of a failed response and turn it into an [`Error`].
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    Err(Error::from_status(provider, status, body))
}
