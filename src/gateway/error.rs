//! Gateway Error Types
//!
//! Structured error handling for content-gateway operations. Maps HTTP
//! status codes to specific variants so callers can distinguish transport
//! failures from domain answers.
//!
//! Errors are `Clone` because a single in-flight request may be shared by
//! many concurrent callers (see the search cache) and each caller gets its
//! own copy of the failure.

/// Gateway error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited — try again after backoff")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),
}

impl GatewayError {
    /// Create a GatewayError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            403 => GatewayError::Forbidden(body.to_string()),
            404 => GatewayError::NotFound(body.to_string()),
            408 => GatewayError::Timeout,
            429 => GatewayError::RateLimited,
            500..=599 => GatewayError::Server(status, body.to_string()),
            _ => GatewayError::Request(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Whether this error means the resource is absent rather than the
    /// call having failed
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_connect() {
            GatewayError::Network(err.to_string())
        } else {
            GatewayError::Request(err.to_string())
        }
    }
}
