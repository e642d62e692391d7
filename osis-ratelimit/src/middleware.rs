//! Framework-neutral rate limiting middleware
//!
//! [`RateLimitMiddleware::check`] turns an incoming request description into
//! an allow/limit decision with the headers to attach. The HTTP layer only
//! has to build a [`RequestInfo`] and render the response.

use crate::RateLimiter;
use crate::error::RateLimitHeaders;
use crate::extractor::{KeyExtractor, RequestInfo};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Rate limiting middleware
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    /// The rate limiter instance
    limiter: Arc<RateLimiter>,
    /// Key extraction strategy
    key_extractor: KeyExtractor,
    /// Whether to add rate limit headers to responses
    include_headers: bool,
    /// Message for rate limit exceeded responses
    error_message: String,
    /// Keys that bypass rate limiting
    bypass_keys: Vec<String>,
    /// Allow requests when the store fails
    skip_on_error: bool,
}

impl RateLimitMiddleware {
    /// Create a new rate limit middleware
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        let config = limiter.config().clone();
        Self {
            limiter,
            key_extractor: KeyExtractor::Ip,
            include_headers: config.include_headers,
            error_message: config.error_message,
            bypass_keys: config.bypass_keys,
            skip_on_error: config.skip_on_error,
        }
    }

    /// Create middleware with a custom key extractor
    pub fn with_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.key_extractor = extractor;
        self
    }

    /// Set whether to include rate limit headers
    pub fn with_headers(mut self, include: bool) -> Self {
        self.include_headers = include;
        self
    }

    /// Set custom error message
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Add bypass keys
    pub fn with_bypass_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.bypass_keys.extend(keys.into_iter().map(|k| k.into()));
        self
    }

    /// Decide whether a request may proceed
    pub async fn check(&self, info: &RequestInfo) -> RateLimitCheckResponse {
        let key = match self.key_extractor.extract(info) {
            Some(k) => k,
            None => {
                warn!(
                    extractor = self.key_extractor.description(),
                    "Could not extract rate limit key, allowing request"
                );
                return RateLimitCheckResponse::Allowed { headers: None };
            }
        };

        trace!(key = %key, "Checking rate limit");

        if self.bypass_keys.contains(&key) {
            debug!(key = %key, "Key is in bypass list, allowing request");
            return RateLimitCheckResponse::Allowed { headers: None };
        }

        match self.limiter.check(&key).await {
            Ok(result) => {
                let headers = self
                    .include_headers
                    .then(|| RateLimitHeaders::from_result(&result));

                if result.allowed {
                    trace!(key = %key, remaining = result.remaining, "Request allowed");
                    RateLimitCheckResponse::Allowed { headers }
                } else {
                    info!(
                        key = %key,
                        path = %info.path,
                        retry_after = ?result.retry_after,
                        "Rate limit exceeded"
                    );
                    RateLimitCheckResponse::Limited {
                        headers,
                        message: self.error_message.clone(),
                        retry_after: result.retry_after.map(|d| d.as_secs().max(1)),
                    }
                }
            }
            Err(e) if self.skip_on_error => {
                warn!(error = %e, "Rate limit check failed, allowing request");
                RateLimitCheckResponse::Allowed { headers: None }
            }
            Err(e) => {
                warn!(error = %e, "Rate limit check failed, rejecting request");
                RateLimitCheckResponse::Limited {
                    headers: None,
                    message: self.error_message.clone(),
                    retry_after: None,
                }
            }
        }
    }

    /// Get the underlying rate limiter
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

/// Response from rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitCheckResponse {
    /// Request is allowed
    Allowed {
        /// Rate limit headers to include in response
        headers: Option<RateLimitHeaders>,
    },
    /// Request is rate limited
    Limited {
        /// Rate limit headers to include in response
        headers: Option<RateLimitHeaders>,
        /// Error message
        message: String,
        /// Seconds until the client should retry
        retry_after: Option<u64>,
    },
}

impl RateLimitCheckResponse {
    /// Check if the request is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Check if the request is limited
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }

    /// Get the headers if any
    pub fn headers(&self) -> Option<&RateLimitHeaders> {
        match self {
            Self::Allowed { headers } => headers.as_ref(),
            Self::Limited { headers, .. } => headers.as_ref(),
        }
    }

    /// Get the error message if limited
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Limited { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Get the retry-after value if limited
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Limited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
