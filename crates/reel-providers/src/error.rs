//! Provider error types.

use reqwest::{Response, StatusCode};
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Explicit overload signal: HTTP 429, a concurrency limit or an
    /// "overloaded" response.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider confirms the resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body fragments providers use to signal overload.
const OVERLOAD_MARKERS: &[&str] = &[
    "concurrent",
    "concurrency",
    "overloaded",
    "too_many_requests",
    "too many requests",
    "rate limit",
    "rate_limit",
];

impl ProviderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match StatusCode::from_u16(status) {
            // A missing resource stays missing whatever the body says.
            Ok(StatusCode::NOT_FOUND) => Self::NotFound(body),
            Ok(StatusCode::TOO_MANY_REQUESTS) => Self::RateLimited(body),
            _ if is_overload_message(&body) => Self::RateLimited(body),
            _ => Self::Api { status, body },
        }
    }

    /// Build the error for a failed response, consuming its body.
    pub async fn from_response(response: Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Self::from_status(status, body)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }

    /// Connection, timeout or other transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}

fn is_overload_message(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    OVERLOAD_MARKERS.iter().any(|marker| lower.contains(marker))
}
