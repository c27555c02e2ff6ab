//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the optional upstream clients, the rate limiter and the
//! per-request tuning read at startup. Nothing else is shared between
//! requests.

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::rate_limit::RateLimiter;
use crate::services::classifier::ClassifierConfig;
use crate::services::images::ImageService;
use crate::services::retry::RetryPolicy;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    /// Vision model client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// Background removal / generation. `None` without a Replicate token.
    pub images: Option<Arc<dyn ImageService>>,
    /// Per-client request limiter for the edit endpoint.
    pub rate_limiter: RateLimiter,
    pub classifier: ClassifierConfig,
    /// Retry policy for image service calls.
    pub retry: RetryPolicy,
}

impl AppState {
    /// Build state with limits and tuning read from the environment.
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>, images: Option<Arc<dyn ImageService>>) -> Self {
        Self {
            llm,
            images,
            rate_limiter: RateLimiter::from_env(),
            classifier: ClassifierConfig::from_env(),
            retry: RetryPolicy::from_env(),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_no_clients_without_config() {
        let state = AppState::new(None, None);
        assert!(state.llm.is_none());
        assert!(state.images.is_none());
        assert_eq!(state.rate_limiter.tracked_clients(), 0);
    }

    #[test]
    fn clones_share_the_rate_limiter() {
        let state = test_helpers::test_app_state(None, None);
        let other = state.clone();
        state.rate_limiter.check_and_record("a").unwrap();
        assert_eq!(other.rate_limiter.tracked_clients(), 1);
    }
}
