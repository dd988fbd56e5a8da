//! Per-user learner: tracked memory states, recall simulation, and the
//! persistence round-trip with the external memory store.
//!
//! A learner is short-lived by design: the production flow reconstructs it
//! from the store for every interaction, applies one learn event, and writes
//! the result back. The snapshot pair [`Learner::dump`]/[`Learner::load`]
//! serves callers that hold state in a non-durable cache instead.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::item::WordItem;
use crate::memory::MemoryState;
use crate::retry::RetryPolicy;
use crate::store::{MemoryRow, MemoryStore};

/// Snapshot form of a [`WordItem`]; accepts the `question`/`answer` synonyms
/// some producers emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(alias = "question")]
    pub source: String,
    #[serde(alias = "answer")]
    pub target: String,
}

/// Snapshot form of one memory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub item: ItemSnapshot,
    #[serde(default)]
    pub external_id: Option<i64>,
    pub n_occurrences: u32,
    pub last_occurrence: i64,
    pub alpha: f64,
    pub beta: f64,
}

/// Full memory snapshot: question text to state.
pub type MemorySnapshot = HashMap<String, StateSnapshot>;

/// Owns the memory states of one user.
#[derive(Debug)]
pub struct Learner {
    memory: HashMap<String, MemoryState>,
    alpha: f64,
    beta: f64,
    rng: ChaCha8Rng,
}

impl Learner {
    /// New empty learner. `alpha` is clamped to be non-negative and `beta`
    /// into `[0, 1)` so the decay model stays well-formed.
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self::with_rng(alpha, beta, ChaCha8Rng::from_entropy())
    }

    /// Deterministic learner for tests and simulations.
    pub fn with_seed(alpha: f64, beta: f64, seed: u64) -> Self {
        Self::with_rng(alpha, beta, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(alpha: f64, beta: f64, rng: ChaCha8Rng) -> Self {
        Self {
            memory: HashMap::new(),
            alpha: alpha.max(0.0),
            beta: beta.clamp(0.0, 1.0 - f64::EPSILON),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// The tracked state for a question, if any.
    pub fn state(&self, question: &str) -> Option<&MemoryState> {
        self.memory.get(question)
    }

    /// Simulated recall: draws a Bernoulli trial with the current recall
    /// probability and returns the stored answer on success.
    ///
    /// Untracked questions return `None` ("never learned, no guess").
    pub fn reply(&mut self, question: &str, now: i64) -> Result<Option<String>, EngineError> {
        if question.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "question must be a non-empty string".into(),
            ));
        }
        let Some(state) = self.memory.get(question) else {
            return Ok(None);
        };
        let memorized = self.rng.gen_bool(state.probability(now));
        Ok(memorized.then(|| state.item.answer().to_string()))
    }

    /// Record one learn event: bump the existing state or create a fresh one
    /// with this learner's decay parameters.
    pub fn learn(
        &mut self,
        item: &WordItem,
        external_id: Option<i64>,
        now: i64,
    ) -> Result<(), EngineError> {
        let question = item.question();
        if question.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "item question must be a non-empty string".into(),
            ));
        }
        match self.memory.get_mut(question) {
            Some(state) => state.touch(now),
            None => {
                self.memory.insert(
                    question.to_string(),
                    MemoryState::first_seen(item.clone(), external_id, now, self.alpha, self.beta),
                );
            }
        }
        Ok(())
    }

    /// Recall probabilities of every tracked question at `now`, weakest
    /// first. Computed in parallel; decks run to thousands of words.
    pub fn probabilities(&self, now: i64) -> Vec<(String, f64)> {
        let mut scored: Vec<(String, f64)> = self
            .memory
            .par_iter()
            .map(|(question, state)| (question.clone(), state.probability(now)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// Serializable snapshot of the full memory mapping.
    pub fn dump(&self) -> MemorySnapshot {
        self.memory
            .iter()
            .map(|(question, state)| {
                (
                    question.clone(),
                    StateSnapshot {
                        item: ItemSnapshot {
                            source: state.item.source.clone(),
                            target: state.item.target.clone(),
                        },
                        external_id: state.external_id,
                        n_occurrences: state.n_occurrences,
                        last_occurrence: state.last_occurrence,
                        alpha: state.alpha,
                        beta: state.beta,
                    },
                )
            })
            .collect()
    }

    /// Replace the entire memory mapping with a snapshot. Always a full
    /// reset-and-load, never a merge.
    pub fn load(&mut self, snapshot: MemorySnapshot) {
        self.memory = snapshot
            .into_iter()
            .map(|(question, state)| {
                (
                    question,
                    MemoryState {
                        item: WordItem::new(state.item.source, state.item.target),
                        external_id: state.external_id,
                        n_occurrences: state.n_occurrences.max(1),
                        last_occurrence: state.last_occurrence,
                        alpha: state.alpha,
                        beta: state.beta,
                    },
                )
            })
            .collect();
    }

    /// Strict JSON snapshot load: any malformed entry aborts the whole load
    /// and the learner keeps its previous state.
    pub fn load_json(&mut self, snapshot: &serde_json::Value) -> Result<(), EngineError> {
        let parsed: MemorySnapshot = serde_json::from_value(snapshot.clone())
            .map_err(|err| EngineError::MalformedSnapshot(err.to_string()))?;
        self.load(parsed);
        Ok(())
    }

    pub fn dump_json(&self) -> serde_json::Value {
        serde_json::to_value(self.dump()).unwrap_or_else(|_| serde_json::Value::Null)
    }

    /// Rebuild a learner from the user's memory rows in the store.
    ///
    /// The read is wrapped in the retry policy: transient busy signals are
    /// retried with a fixed delay, anything else fails immediately.
    pub fn load_from_store<S: MemoryStore>(
        store: &S,
        user: &str,
        alpha: f64,
        beta: f64,
        retry: &RetryPolicy,
    ) -> Result<Self, EngineError> {
        let rows = retry.run(|| store.load_memory(user))?;
        let mut learner = Self::new(alpha, beta);
        for row in rows {
            let item = WordItem::new(row.source_word.clone(), row.target_word);
            learner.memory.insert(
                row.source_word,
                MemoryState {
                    item,
                    external_id: Some(row.vocabulary_id),
                    n_occurrences: row.n_occurrences.max(1),
                    last_occurrence: row.last_occurrence,
                    alpha: row.alpha,
                    beta: row.beta,
                },
            );
        }
        tracing::debug!(user, entries = learner.memory.len(), "memory loaded from store");
        Ok(learner)
    }

    /// Persist every tracked state back to the store, upserting by
    /// `(user, vocabulary)`.
    ///
    /// States must carry an `external_id` that resolves in the store;
    /// otherwise the save fails with [`EngineError::UnknownVocabulary`].
    /// Each upsert is wrapped in the retry policy.
    pub fn save_to_store<S: MemoryStore>(
        &self,
        store: &S,
        user: &str,
        retry: &RetryPolicy,
    ) -> Result<(), EngineError> {
        for state in self.memory.values() {
            let Some(vocabulary_id) = state.external_id else {
                return Err(EngineError::UnknownVocabulary { id: None });
            };
            let row = MemoryRow {
                vocabulary_id,
                source_word: state.item.source.clone(),
                target_word: state.item.target.clone(),
                n_occurrences: state.n_occurrences,
                last_occurrence: state.last_occurrence,
                alpha: state.alpha,
                beta: state.beta,
            };
            retry
                .run(|| store.upsert_memory(user, &row))
                .map_err(|err| match err {
                    EngineError::NotFound(_) => EngineError::UnknownVocabulary {
                        id: Some(vocabulary_id),
                    },
                    other => other,
                })?;
        }
        tracing::debug!(user, entries = self.memory.len(), "memory persisted to store");
        Ok(())
    }
}
