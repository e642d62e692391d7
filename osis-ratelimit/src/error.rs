//! Error types for rate limiting

use crate::RateLimitCheckResult;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?}")]
    LimitExceeded {
        /// Total limit
        limit: u64,
        /// When the limit resets (Unix timestamp)
        reset_at: u64,
        /// Time to wait before retrying
        retry_after: Duration,
    },

    /// Store error
    #[error("Rate limit store error: {0}")]
    StoreError(String),

    /// Configuration error
    #[error("Rate limit configuration error: {0}")]
    ConfigError(String),
}

impl RateLimitError {
    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::StoreError(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if this error is a rate limit exceeded error
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. })
    }

    /// Get the retry-after duration if this is a limit exceeded error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::LimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

const LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Standard rate limit headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// X-RateLimit-Limit: Maximum requests allowed
    pub limit: u64,
    /// X-RateLimit-Remaining: Requests remaining in current window
    pub remaining: u64,
    /// X-RateLimit-Reset: Unix timestamp when the limit resets
    pub reset: u64,
    /// Retry-After: Seconds until the client should retry (only when limited)
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    /// Build headers from a check result
    pub fn from_result(result: &RateLimitCheckResult) -> Self {
        Self {
            limit: result.limit,
            remaining: result.remaining,
            reset: result.reset_at,
            retry_after: if result.allowed {
                None
            } else {
                Some(ceil_secs(result.retry_after.unwrap_or(Duration::from_secs(1))))
            },
        }
    }

    /// Get header name/value pairs
    pub fn to_header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset.to_string()),
        ];

        if let Some(retry) = self.retry_after {
            headers.push(("Retry-After", retry.to_string()));
        }

        headers
    }

    /// Insert the headers into an HTTP header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT, HeaderValue::from(self.limit));
        headers.insert(REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RESET, HeaderValue::from(self.reset));
        if let Some(retry) = self.retry_after {
            headers.insert(http::header::RETRY_AFTER, HeaderValue::from(retry));
        }
    }
}

/// Whole seconds, rounded up, never zero
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    let secs = if duration.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(1)
}
