//! In-memory rate limit store
//!
//! Uses DashMap for thread-safe concurrent access. Each key's log is mutated
//! while holding that key's entry, so prune, check and append happen as one
//! step with respect to concurrent requests for the same key.

use crate::error::RateLimitResult;
use crate::stores::{RateLimitStore, WindowSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// In-memory sliding-window log store
pub struct MemoryStore {
    logs: DashMap<String, VecDeque<Instant>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory rate limit store");
        Self {
            logs: DashMap::new(),
        }
    }

    /// Get the number of tracked keys (for monitoring)
    pub fn key_count(&self) -> usize {
        self.logs.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove timestamps at least `window` old from the front of the log
fn prune_log(log: &mut VecDeque<Instant>, window: Duration, now: Instant) -> usize {
    let mut removed = 0;
    while let Some(front) = log.front() {
        if now.saturating_duration_since(*front) >= window {
            log.pop_front();
            removed += 1;
        } else {
            break;
        }
    }
    removed
}

fn snapshot(log: &VecDeque<Instant>) -> WindowSnapshot {
    WindowSnapshot {
        count: log.len() as u64,
        oldest: log.front().copied(),
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str, window: Duration) -> RateLimitResult<WindowSnapshot> {
        let now = Instant::now();
        match self.logs.get_mut(key) {
            Some(mut log) => {
                prune_log(&mut log, window, now);
                Ok(snapshot(&log))
            }
            None => Ok(WindowSnapshot::empty()),
        }
    }

    async fn increment(
        &self,
        key: &str,
        max_requests: u64,
        window: Duration,
    ) -> RateLimitResult<(bool, WindowSnapshot)> {
        trace!(key = %key, max_requests = max_requests, window = ?window, "Sliding window check");

        let now = Instant::now();
        let mut log = self.logs.entry(key.to_string()).or_default();

        prune_log(&mut log, window, now);

        if (log.len() as u64) < max_requests {
            log.push_back(now);
            trace!(key = %key, count = log.len(), "Sliding window: allowed");
            Ok((true, snapshot(&log)))
        } else {
            trace!(key = %key, "Sliding window: denied");
            Ok((false, snapshot(&log)))
        }
    }

    async fn prune(&self, key: &str, window: Duration) -> RateLimitResult<usize> {
        let now = Instant::now();
        Ok(self
            .logs
            .get_mut(key)
            .map(|mut log| prune_log(&mut log, window, now))
            .unwrap_or(0))
    }

    async fn reset(&self, key: &str) -> RateLimitResult<()> {
        debug!(key = %key, "Resetting rate limit state");
        self.logs.remove(key);
        Ok(())
    }

    async fn cleanup(&self, prefix: &str, idle: Duration) -> RateLimitResult<usize> {
        let now = Instant::now();
        let before = self.logs.len();

        self.logs.retain(|key, log| {
            if !key.starts_with(prefix) {
                return true;
            }
            match log.back() {
                Some(last) => now.saturating_duration_since(*last) < idle,
                None => false,
            }
        });

        let removed = before.saturating_sub(self.logs.len());
        debug!(prefix = %prefix, removed, key_count = self.key_count(), "Cleanup complete");
        Ok(removed)
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
