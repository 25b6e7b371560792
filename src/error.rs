use reqwest::StatusCode;
use thiserror::Error;

/// Response context captured when GitHub signals an exhausted rate limit.
///
/// A live `reqwest::Response` cannot travel inside an error value, so the
/// fields callers need for inspection and backoff decisions are extracted
/// before the response is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub status: StatusCode,
    pub remaining: i64,
    /// Unix timestamp from `X-RateLimit-Reset`, when present.
    pub reset: Option<i64>,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("GitHub rate limit exceeded")]
    RateLimited(Box<RateLimitInfo>),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP transport error: {0}")]
    Http(reqwest::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
    #[error("Authentication failed")]
    AuthError,
    #[error("Not found")]
    NotFound,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Http(err) }
    }
}

impl AppError {
    /// The HTTP status attached to the failure, when one exists.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RateLimited(info) => Some(info.status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_status() {
        let err = AppError::RateLimited(Box::new(RateLimitInfo {
            status: StatusCode::FORBIDDEN,
            remaining: 0,
            reset: Some(1_700_000_000),
            body: String::new(),
        }));
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.to_string(), "GitHub rate limit exceeded");
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        assert_eq!(AppError::Timeout.status(), None);
        assert_eq!(AppError::AuthError.status(), None);
    }
}
