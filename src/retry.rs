//! Bounded retry for transient store contention.

use std::time::Duration;

use crate::error::EngineError;
use crate::store::StoreError;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fixed-delay retry bound, applied at the storage-adapter boundary.
///
/// Only [`StoreError::Busy`] is retried; every other failure propagates
/// immediately. The delay blocks the calling thread; the core has no
/// background tasks and no other waiting.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, fails non-transiently, or the attempt
    /// budget is exhausted.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, EngineError> {
        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(StoreError::Busy) => {
                    tracing::warn!(attempt, max = self.max_attempts, "store busy, retrying");
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.delay);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EngineError::StoreUnavailable {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(0))
    }

    #[test]
    fn test_success_passes_through() {
        let result: Result<u32, _> = policy().run(|| Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_busy_is_retried_until_success() {
        let mut calls = 0;
        let result = policy().run(|| {
            calls += 1;
            if calls < 3 {
                Err(StoreError::Busy)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_exhaustion_reports_store_unavailable() {
        let mut calls = 0;
        let result: Result<(), _> = policy().run(|| {
            calls += 1;
            Err(StoreError::Busy)
        });
        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(EngineError::StoreUnavailable { attempts: 3 })
        ));
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = policy().run(|| {
            calls += 1;
            Err(StoreError::NotFound("vocabulary 9".into()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
