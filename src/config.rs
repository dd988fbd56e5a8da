//! Engine configuration.

use std::time::Duration;

use crate::memory::{DEFAULT_ALPHA, DEFAULT_BETA};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Decay parameters and retry bounds for one engine scope.
///
/// Constructed per request or per configured scope and passed in
/// explicitly; nothing in the crate reads it from shared state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base forgetting rate handed to fresh memory states.
    pub alpha: f64,
    /// Per-repetition learning gain handed to fresh memory states.
    pub beta: f64,
    /// Retry bounds for the persistence round-trip.
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let alpha = std::env::var("MEMORY_ALPHA")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(DEFAULT_ALPHA);

        let beta = std::env::var("MEMORY_BETA")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(DEFAULT_BETA);

        let max_attempts = std::env::var("STORE_RETRY_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let delay = std::env::var("STORE_RETRY_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_DELAY);

        Self {
            alpha,
            beta,
            retry: RetryPolicy::new(max_attempts, delay),
        }
    }
}
