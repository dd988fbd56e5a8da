//! Teaching material: immutable question/answer pairs.

use serde::{Deserialize, Serialize};

/// A single source/target word pair.
///
/// Identity is the question text: two items with the same `source` are the
/// same item for lookup purposes, regardless of `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordItem {
    pub source: String,
    pub target: String,
}

impl WordItem {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The prompt shown to the learner.
    pub fn question(&self) -> &str {
        &self.source
    }

    /// The expected reply.
    pub fn answer(&self) -> &str {
        &self.target
    }

    /// Exact comparison against the stored target.
    ///
    /// Graders that accept formatting differences should go through
    /// [`crate::answer::answers_match`] instead.
    pub fn is_answer_correct(&self, answer: &str) -> bool {
        self.target == answer
    }
}

impl PartialEq for WordItem {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for WordItem {}

impl std::hash::Hash for WordItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}
