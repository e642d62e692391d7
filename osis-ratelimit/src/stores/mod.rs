//! Rate limit storage backends
//!
//! The limiter owns an `Arc<dyn RateLimitStore>` handed to it at build time,
//! so several limiters can share one store (keys are prefixed per limiter)
//! and tests can substitute their own implementation.

mod memory;

pub use memory::MemoryStore;

use crate::error::RateLimitResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Requests recorded for one key inside the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Timestamps still inside the window
    pub count: u64,
    /// Oldest timestamp still inside the window
    pub oldest: Option<Instant>,
}

impl WindowSnapshot {
    /// Snapshot of a key with no recorded requests
    pub fn empty() -> Self {
        Self {
            count: 0,
            oldest: None,
        }
    }

    /// Time until the oldest recorded request leaves the window
    pub fn retry_after(&self, window: Duration, now: Instant) -> Duration {
        match self.oldest {
            Some(oldest) => window.saturating_sub(now.saturating_duration_since(oldest)),
            None => Duration::ZERO,
        }
    }
}

/// Trait for sliding-window log storage backends
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Prune and count a key's window without recording a request
    async fn get(&self, key: &str, window: Duration) -> RateLimitResult<WindowSnapshot>;

    /// Prune, check against `max_requests`, and record `now` if allowed.
    ///
    /// Must be atomic per key. Returns `(allowed, snapshot)` where the
    /// snapshot includes the request just recorded.
    async fn increment(
        &self,
        key: &str,
        max_requests: u64,
        window: Duration,
    ) -> RateLimitResult<(bool, WindowSnapshot)>;

    /// Drop timestamps older than the window; returns how many were removed
    async fn prune(&self, key: &str, window: Duration) -> RateLimitResult<usize>;

    /// Reset rate limit state for a key
    async fn reset(&self, key: &str) -> RateLimitResult<()>;

    /// Forget keys under `prefix` with no request newer than `idle`;
    /// returns keys removed. Keys outside `prefix` are left alone.
    async fn cleanup(&self, _prefix: &str, _idle: Duration) -> RateLimitResult<usize> {
        Ok(0)
    }

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}
