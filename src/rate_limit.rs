//! In-memory rate limiting for edit requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by client identifier. One limit is enforced: at most
//! `RATE_LIMIT_PER_CLIENT` accepted requests per client inside the trailing
//! `RATE_LIMIT_WINDOW_SECS`. Rejected requests are not recorded.
//!
//! TRADE-OFFS
//! ==========
//! Windows are pruned lazily on access, so a client that stops calling keeps
//! its (now stale) deque until the background sweep drops it. Requests
//! without a client identifier all share the `"unknown"` bucket.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::config::{Lookup, env_lookup, parse_or};
use crate::error::ErrorCode;

const DEFAULT_PER_CLIENT_LIMIT: usize = 10;
const DEFAULT_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    #[must_use]
    pub fn from_lookup(var: Lookup<'_>) -> Self {
        Self {
            limit: parse_or(var, "RATE_LIMIT_PER_CLIENT", DEFAULT_PER_CLIENT_LIMIT),
            window: Duration::from_secs(parse_or(var, "RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_PER_CLIENT_LIMIT, window: Duration::from_secs(DEFAULT_WINDOW_SECS) }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("per-client rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerClientExceeded { limit: usize, window_secs: u64 },
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), config }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Accept-or-reject form of [`RateLimiter::check_and_record_at`].
    #[must_use]
    pub fn allow(&self, client_id: &str, now: Instant) -> bool {
        self.check_and_record_at(client_id, now).is_ok()
    }

    /// Check the client's window, then record the request if accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::PerClientExceeded`] when the window is full.
    pub fn check_and_record(&self, client_id: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(client_id, Instant::now())
    }

    /// Check + record with an explicit timestamp. Prune, count and append
    /// all happen under one lock.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::PerClientExceeded`] when the window is full.
    pub fn check_and_record_at(&self, client_id: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = self.config;

        let deque = inner.entry(client_id.to_string()).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.limit {
            return Err(RateLimitError::PerClientExceeded { limit: cfg.limit, window_secs: cfg.window.as_secs() });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Number of clients currently holding a window.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop clients whose windows are empty at `now`. Returns how many were
    /// removed.
    pub fn prune_idle(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.config.window;
        let before = inner.len();
        inner.retain(|_, deque| {
            prune_window(deque, now, window);
            !deque.is_empty()
        });
        before - inner.len()
    }

    /// Spawn the background sweep that calls [`RateLimiter::prune_idle`]
    /// once per window.
    #[must_use]
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.window.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = limiter.prune_idle(Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = limiter.tracked_clients(), "rate limiter: pruned idle clients");
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Drop instants at least `window` old. The front is always the oldest.
fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
