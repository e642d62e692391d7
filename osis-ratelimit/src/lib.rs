//! # OSIS Rate Limiting
//!
//! Sliding-window log rate limiting for the registration portal.
//!
//! Each client key keeps the timestamps of its accepted requests. On every
//! check the timestamps older than the window are pruned; if the remaining
//! count is already at the maximum the request is rejected without being
//! recorded, otherwise the current time is appended and the request passes.
//!
//! ## Features
//!
//! - **Injectable store**: `Arc<dyn RateLimitStore>` with an in-memory
//!   DashMap default; several limiters may share one store
//! - **Key extraction**: by client IP, IP + path, or a header
//! - **Standard headers**: `X-RateLimit-Limit`, `X-RateLimit-Remaining`,
//!   `X-RateLimit-Reset`, `Retry-After`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use osis_ratelimit::RateLimiter;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Three registrations per hour
//! let limiter = RateLimiter::builder()
//!     .sliding_window(3, Duration::from_secs(3600))
//!     .key_prefix("register")
//!     .build()?;
//!
//! let result = limiter.check("203.0.113.7").await?;
//! if result.allowed {
//!     println!("Request allowed, {} remaining", result.remaining);
//! } else {
//!     println!("Rate limited, retry after {:?}", result.retry_after);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod stores;

pub use config::{DEFAULT_ERROR_MESSAGE, RateLimitConfig, RateLimiterBuilder};
pub use error::{RateLimitError, RateLimitHeaders, RateLimitResult};
pub use extractor::{KeyExtractor, RequestInfo};
pub use middleware::{RateLimitCheckResponse, RateLimitMiddleware};
pub use stores::{MemoryStore, RateLimitStore, WindowSnapshot};

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitCheckResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Number of remaining requests in the current window
    pub remaining: u64,
    /// Maximum number of requests allowed
    pub limit: u64,
    /// When the oldest recorded request leaves the window (Unix seconds)
    pub reset_at: u64,
    /// Time until another request would be accepted (denied results only)
    pub retry_after: Option<Duration>,
}

impl RateLimitCheckResult {
    /// Create a new allowed result
    pub fn allowed(remaining: u64, limit: u64, reset_at: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            limit,
            reset_at,
            retry_after: None,
        }
    }

    /// Create a new denied result
    pub fn denied(limit: u64, reset_at: u64, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit,
            reset_at,
            retry_after: Some(retry_after),
        }
    }

    /// The matching error for a denied result
    pub fn error(&self) -> Option<RateLimitError> {
        if self.allowed {
            return None;
        }
        Some(RateLimitError::LimitExceeded {
            limit: self.limit,
            reset_at: self.reset_at,
            retry_after: self.retry_after.unwrap_or(Duration::from_secs(1)),
        })
    }
}

/// Sliding-window rate limiter over an injected store
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter builder
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::new()
    }

    /// Create a new rate limiter with the given store and configuration
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        debug!(
            max_requests = config.max_requests,
            window = ?config.window,
            "Creating new rate limiter"
        );
        Self { store, config }
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Check if a request with the given key is allowed, recording it if so
    pub async fn check(&self, key: &str) -> RateLimitResult<RateLimitCheckResult> {
        trace!(key = %key, "Checking rate limit");

        let max_requests = self.config.max_requests;
        let window = self.config.window;
        let (allowed, snapshot) = self
            .store
            .increment(&self.store_key(key), max_requests, window)
            .await?;

        let reset_in = snapshot.retry_after(window, Instant::now());
        let reset_at = unix_now() + reset_in.as_secs();

        if allowed {
            let remaining = max_requests.saturating_sub(snapshot.count);
            debug!(key = %key, remaining, "Sliding window: request allowed");
            Ok(RateLimitCheckResult::allowed(remaining, max_requests, reset_at))
        } else {
            warn!(key = %key, retry_after = ?reset_in, "Sliding window: request denied");
            Ok(RateLimitCheckResult::denied(max_requests, reset_at, reset_in))
        }
    }

    /// Remaining requests for a key without recording one
    pub async fn remaining(&self, key: &str) -> RateLimitResult<u64> {
        let snapshot = self.store.get(&self.store_key(key), self.config.window).await?;
        Ok(self.config.max_requests.saturating_sub(snapshot.count))
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Get the backing store
    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Reset the rate limit for a key
    pub async fn reset(&self, key: &str) -> RateLimitResult<()> {
        debug!(key = %key, "Resetting rate limit");
        self.store.reset(&self.store_key(key)).await
    }

    /// Periodically forget this limiter's keys idle for longer than its
    /// window. Keys of other limiters on the same store are not touched.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        let prefix = self.store_key("");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                match limiter.store.cleanup(&prefix, limiter.config.window).await {
                    Ok(removed) => trace!(removed, "Rate limit cleanup"),
                    Err(e) => warn!(error = %e, "Rate limit cleanup failed"),
                }
            }
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store.store_type())
            .field("config", &self.config)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn limiter(max: u64, window: Duration) -> RateLimiter {
        RateLimiter::builder().sliding_window(max, window).build().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_per_hour_then_reject_then_recover() {
        let limiter = limiter(3, HOUR);

        for i in 0..3 {
            let result = limiter.check("203.0.113.7").await.unwrap();
            assert!(result.allowed, "Request {} should be allowed", i);
            assert_eq!(result.remaining, 2 - i);
        }

        let result = limiter.check("203.0.113.7").await.unwrap();
        assert!(!result.allowed, "4th request should be denied");
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after, Some(HOUR));

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert!(!limiter.check("203.0.113.7").await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        let result = limiter.check("203.0.113.7").await.unwrap();
        assert!(result.allowed, "request after the window should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_tracks_oldest_request() {
        let limiter = limiter(2, Duration::from_secs(60));
        limiter.check("k").await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        limiter.check("k").await.unwrap();

        let result = limiter.check("k").await.unwrap();
        assert_eq!(result.retry_after, Some(Duration::from_secs(40)));
        assert!(result.error().unwrap().is_limit_exceeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys() {
        let limiter = limiter(1, HOUR);
        assert!(limiter.check("key1").await.unwrap().allowed);
        assert!(!limiter.check("key1").await.unwrap().allowed);
        assert!(limiter.check("key2").await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_limiters_share_store() {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
        let register = RateLimiter::builder()
            .sliding_window(1, HOUR)
            .key_prefix("register")
            .store(store.clone())
            .build()
            .unwrap();
        let general = RateLimiter::builder()
            .sliding_window(5, Duration::from_secs(900))
            .key_prefix("api")
            .store(store)
            .build()
            .unwrap();

        assert!(register.check("ip").await.unwrap().allowed);
        assert!(!register.check("ip").await.unwrap().allowed);
        assert!(general.check("ip").await.unwrap().allowed);
        assert_eq!(general.remaining("ip").await.unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let limiter = limiter(1, HOUR);
        limiter.check("k").await.unwrap();
        assert_eq!(limiter.remaining("k").await.unwrap(), 0);

        limiter.reset("k").await.unwrap();
        assert_eq!(limiter.remaining("k").await.unwrap(), 1);
        assert!(limiter.check("k").await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_cleanup_forgets_idle_keys() {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(
            RateLimiter::builder()
                .sliding_window(5, Duration::from_secs(60))
                .store(store.clone())
                .build()
                .unwrap(),
        );
        limiter.check("idle").await.unwrap();
        assert_eq!(store.key_count(), 1);

        let handle = limiter.spawn_cleanup(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.key_count(), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_window_cleanup_keeps_other_limiter_keys() {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
        let register = Arc::new(
            RateLimiter::builder()
                .sliding_window(3, HOUR)
                .key_prefix("register")
                .store(store.clone())
                .build()
                .unwrap(),
        );
        let general = Arc::new(
            RateLimiter::builder()
                .sliding_window(100, Duration::from_secs(900))
                .key_prefix("api")
                .store(store)
                .build()
                .unwrap(),
        );
        let tasks = [
            register.spawn_cleanup(Duration::from_secs(60)),
            general.spawn_cleanup(Duration::from_secs(60)),
        ];

        for _ in 0..3 {
            assert!(register.check("203.0.113.7").await.unwrap().allowed);
        }
        assert!(!register.check("203.0.113.7").await.unwrap().allowed);

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        assert!(!register.check("203.0.113.7").await.unwrap().allowed);

        tokio::time::sleep(Duration::from_secs(41 * 60)).await;
        assert!(register.check("203.0.113.7").await.unwrap().allowed);

        for task in tasks {
            task.abort();
        }
    }
}
