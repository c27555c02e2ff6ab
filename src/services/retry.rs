//! Bounded retry with linear backoff for upstream calls.
//!
//! Only errors whose [`ErrorCode::retryable`] is true are retried; shape
//! and validation failures return on the first attempt. Attempt `n` that
//! fails sleeps `n * base_delay` before attempt `n + 1`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::{Lookup, env_lookup, parse_or};
use crate::error::ErrorCode;

const DEFAULT_UPSTREAM_RETRIES: usize = 2;
const DEFAULT_UPSTREAM_RETRY_BASE_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero behaves like one.
    pub attempts: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    /// - `UPSTREAM_RETRIES`: total attempts, default 2
    /// - `UPSTREAM_RETRY_BASE_MS`: default 250
    #[must_use]
    pub fn from_lookup(var: Lookup<'_>) -> Self {
        Self {
            attempts: parse_or(var, "UPSTREAM_RETRIES", DEFAULT_UPSTREAM_RETRIES),
            base_delay: Duration::from_millis(parse_or(var, "UPSTREAM_RETRY_BASE_MS", DEFAULT_UPSTREAM_RETRY_BASE_MS)),
        }
    }

    /// Single attempt, no delay.
    #[must_use]
    pub fn none() -> Self {
        Self { attempts: 1, base_delay: Duration::ZERO }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up. Returns the last result.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &'static str, mut op: F) -> Result<T, E>
    where
        E: ErrorCode,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.retryable() && attempt < attempts => {
                    warn!(error = %e, code = e.error_code(), attempt, total = attempts, label, "upstream call failed; retrying");
                    let factor = u32::try_from(attempt).unwrap_or(u32::MAX);
                    tokio::time::sleep(self.base_delay.saturating_mul(factor)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_UPSTREAM_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_UPSTREAM_RETRY_BASE_MS),
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
