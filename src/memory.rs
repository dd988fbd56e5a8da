//! Exponential forgetting-curve memory model.
//!
//! Recall probability of a tracked item decays exponentially with the time
//! elapsed since its last exposure, and each repetition shrinks the decay
//! rate by a multiplicative factor:
//!
//! ```text
//! P = exp(-alpha * (1 - beta)^n_occurrences * (now - last_occurrence))
//! ```
//!
//! `alpha` is the base forgetting rate, `beta` the per-repetition learning
//! gain. With `0 < beta < 1`, more repetitions mean slower forgetting;
//! `alpha = 0` models an item that is never forgotten.

use serde::{Deserialize, Serialize};

use crate::item::WordItem;

/// Default base forgetting rate.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// Default per-repetition learning gain.
pub const DEFAULT_BETA: f64 = 0.5;

/// Per-item memorization record, owned by one [`crate::learner::Learner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryState {
    /// The item this state tracks.
    pub item: WordItem,
    /// Identifier of the vocabulary row in the caller's store, if any.
    pub external_id: Option<i64>,
    /// Number of learn events seen so far. At least 1 once a state exists.
    pub n_occurrences: u32,
    /// Epoch seconds of the most recent learn event.
    pub last_occurrence: i64,
    /// Base forgetting rate, fixed at learner construction.
    pub alpha: f64,
    /// Per-repetition gain, fixed at learner construction.
    pub beta: f64,
}

impl MemoryState {
    /// State for an item seen for the first time at `now`.
    pub fn first_seen(
        item: WordItem,
        external_id: Option<i64>,
        now: i64,
        alpha: f64,
        beta: f64,
    ) -> Self {
        Self {
            item,
            external_id,
            n_occurrences: 1,
            last_occurrence: now,
            alpha,
            beta,
        }
    }

    /// Record one more exposure at `now`.
    pub fn touch(&mut self, now: i64) {
        self.n_occurrences += 1;
        self.last_occurrence = now;
    }

    /// Probability of successful recall at `now`, in `[0, 1]`.
    ///
    /// A `now` earlier than the last occurrence (clock skew, out-of-order
    /// events) reads as perfect recall: the raw formula would exceed 1 and is
    /// clamped.
    pub fn probability(&self, now: i64) -> f64 {
        let elapsed = (now - self.last_occurrence) as f64;
        let rate = self.alpha * (1.0 - self.beta).powf(f64::from(self.n_occurrences));
        (-rate * elapsed).exp().clamp(0.0, 1.0)
    }
}
