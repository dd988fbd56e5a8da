//! Crate-level error taxonomy.

use crate::store::StoreError;

/// Failures surfaced by the scheduling/memory core.
///
/// Only transient store contention is ever retried: the retry policy wraps
/// the persistence calls and converts a persistent [`StoreError::Busy`] into
/// [`EngineError::StoreUnavailable`]. Everything else propagates to the
/// caller unmodified.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed arguments or violated local preconditions. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Selection was invoked with no material to choose from.
    #[error("no material to choose from")]
    EmptyCandidateSet,

    /// The store stayed busy through every retry attempt.
    #[error("store still busy after {attempts} attempts")]
    StoreUnavailable { attempts: u32 },

    /// A memory state references a vocabulary id the store cannot resolve.
    #[error("vocabulary id {id:?} does not resolve in the store")]
    UnknownVocabulary { id: Option<i64> },

    /// Referential lookup failure against the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Corrupt or schema-mismatched snapshot input. The whole load is
    /// aborted; no partial state is applied.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Any other storage-layer failure, passed through as-is.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Store(other),
        }
    }
}
