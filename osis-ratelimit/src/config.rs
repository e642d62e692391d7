//! Rate limiter configuration and builder

use crate::RateLimiter;
use crate::error::{RateLimitError, RateLimitResult};
use crate::stores::{MemoryStore, RateLimitStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default message returned to rate limited clients
pub const DEFAULT_ERROR_MESSAGE: &str = "Terlalu banyak permintaan. Silakan coba lagi nanti.";

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u64,
    /// Sliding window length
    pub window: Duration,
    /// Key prefix for storage
    pub key_prefix: String,
    /// Include rate limit headers in responses
    pub include_headers: bool,
    /// Allow the request when the store fails
    pub skip_on_error: bool,
    /// Message returned when rate limited
    pub error_message: String,
    /// Bypass keys (these keys will never be rate limited)
    pub bypass_keys: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            key_prefix: "ratelimit".to_string(),
            include_headers: true,
            skip_on_error: true,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            bypass_keys: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Check if a key should bypass rate limiting
    pub fn should_bypass(&self, key: &str) -> bool {
        self.bypass_keys.iter().any(|k| k == key)
    }
}

/// Builder for creating a RateLimiter
pub struct RateLimiterBuilder {
    window: Option<(u64, Duration)>,
    store: Option<Arc<dyn RateLimitStore>>,
    key_prefix: String,
    include_headers: bool,
    skip_on_error: bool,
    error_message: Option<String>,
    bypass_keys: Vec<String>,
}

impl RateLimiterBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            window: None,
            store: None,
            key_prefix: "ratelimit".to_string(),
            include_headers: true,
            skip_on_error: true,
            error_message: None,
            bypass_keys: Vec::new(),
        }
    }

    /// Allow `max_requests` per trailing `window`
    pub fn sliding_window(mut self, max_requests: u64, window: Duration) -> Self {
        self.window = Some((max_requests, window));
        self
    }

    /// Use a specific store instead of a fresh in-memory one
    pub fn store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the key prefix for storage
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Include rate limit headers in responses
    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = include;
        self
    }

    /// Skip rate limiting on store errors
    pub fn skip_on_error(mut self, skip: bool) -> Self {
        self.skip_on_error = skip;
        self
    }

    /// Set custom error message when rate limited
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Add a key that should bypass rate limiting
    pub fn bypass_key(mut self, key: impl Into<String>) -> Self {
        self.bypass_keys.push(key.into());
        self
    }

    /// Add multiple keys that should bypass rate limiting
    pub fn bypass_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.bypass_keys.extend(keys.into_iter().map(|k| k.into()));
        self
    }

    /// Build the rate limiter
    pub fn build(self) -> RateLimitResult<RateLimiter> {
        let (max_requests, window) = self
            .window
            .ok_or_else(|| RateLimitError::config("Sliding window must be specified"))?;

        if max_requests == 0 {
            return Err(RateLimitError::config("Max requests must be greater than 0"));
        }
        if window.is_zero() {
            return Err(RateLimitError::config("Window must be non-zero"));
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn RateLimitStore>);

        debug!(
            max_requests,
            window = ?window,
            store_type = store.store_type(),
            prefix = %self.key_prefix,
            "Building rate limiter"
        );

        let config = RateLimitConfig {
            max_requests,
            window,
            key_prefix: self.key_prefix,
            include_headers: self.include_headers,
            skip_on_error: self.skip_on_error,
            error_message: self
                .error_message
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            bypass_keys: self.bypass_keys,
        };

        Ok(RateLimiter::new(store, config))
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
