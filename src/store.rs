//! External-store contracts and reference backends.
//!
//! All durable state lives outside the core, behind the narrow read/write
//! traits in this module. Real deployments put a database behind them; the
//! crate ships two in-process backends: [`InMemoryStore`], which implements
//! every contract and backs the test suite, and [`SnapshotCache`], a
//! session-cache style memory backend that demonstrates snapshot persistence
//! behind the same trait rather than a second code path.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::quiz::{QuizHistoryEntry, QuizPool};

/// Storage-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transient contention ("database is locked"). The only retryable
    /// class; see [`crate::retry::RetryPolicy`].
    #[error("store busy")]
    Busy,

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend-specific failure. Not retryable.
    #[error("backend error: {0}")]
    Backend(String),
}

/// One vocabulary row as the store knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyRow {
    pub id: i64,
    pub source_word: String,
    pub target_word: String,
}

/// One per-user memory row, joined with the vocabulary text it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRow {
    pub vocabulary_id: i64,
    pub source_word: String,
    pub target_word: String,
    pub n_occurrences: u32,
    pub last_occurrence: i64,
    pub alpha: f64,
    pub beta: f64,
}

/// One logged answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub vocabulary_id: i64,
    pub quiz_id: Option<u64>,
    pub given_answer: String,
    pub is_correct: bool,
}

/// Read access to the vocabulary material.
pub trait VocabularyStore {
    /// Resolve a vocabulary id to its word pair.
    fn vocabulary(&self, id: i64) -> Result<VocabularyRow, StoreError>;

    /// All vocabulary rows of a deck, in deck order.
    fn deck_vocabulary(&self, deck_id: i64) -> Result<Vec<VocabularyRow>, StoreError>;
}

/// Per-user memory rows.
///
/// Both operations participate in the transient-busy/retry contract: a
/// backend under contention returns [`StoreError::Busy`] and the caller
/// retries. `upsert_memory` must reject rows whose `vocabulary_id` the
/// backend cannot resolve with [`StoreError::NotFound`].
pub trait MemoryStore {
    fn load_memory(&self, user: &str) -> Result<Vec<MemoryRow>, StoreError>;

    /// Insert or overwrite the row keyed by `(user, vocabulary_id)`.
    fn upsert_memory(&self, user: &str, row: &MemoryRow) -> Result<(), StoreError>;
}

/// Quiz pools and their history.
pub trait QuizStore {
    /// Tracked memory items of `user` that no quiz pool has claimed yet.
    fn quiz_candidates(&self, user: &str) -> Result<Vec<VocabularyRow>, StoreError>;

    /// Persist a new pool over the given vocabulary ids and return it.
    fn insert_quiz(
        &self,
        user: &str,
        name: &str,
        vocabulary_ids: &[i64],
    ) -> Result<QuizPool, StoreError>;

    /// Current state of a pool.
    fn quiz(&self, quiz_id: u64) -> Result<QuizPool, StoreError>;

    /// Run `f` with exclusive access to the pool.
    ///
    /// This is the lock the pick-and-increment sequence relies on: while `f`
    /// runs, no other caller can observe or mutate the pool, so each pool
    /// item is delivered at most once per pass.
    fn with_quiz<T>(
        &self,
        quiz_id: u64,
        f: impl FnOnce(&mut QuizPool) -> T,
    ) -> Result<T, StoreError>;

    /// Append one completed pass to the user's quiz history.
    fn append_history(&self, user: &str, entry: QuizHistoryEntry) -> Result<(), StoreError>;

    /// Number of completed passes recorded under this quiz name.
    fn attempt_count(&self, user: &str, name: &str) -> Result<u32, StoreError>;
}

/// Answer log.
pub trait AnswerStore {
    /// Append one answer and return its id.
    fn append_answer(&self, user: &str, record: AnswerRecord) -> Result<u64, StoreError>;
}

/// Daily goal counters.
///
/// Every method is get-or-create-then-increment and must be atomic per
/// `(user, session, date)` key: concurrent increments may not lose updates.
pub trait ProgressStore {
    /// Add to today's review counter and return the new total.
    fn add_reviews(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
        count: u32,
    ) -> Result<u32, StoreError>;

    /// Add to today's minute counter and return the new total.
    fn add_minutes(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<u32, StoreError>;

    fn reviews_on(&self, user: &str, session_id: u64, date: NaiveDate)
        -> Result<u32, StoreError>;

    fn minutes_on(&self, user: &str, session_id: u64, date: NaiveDate)
        -> Result<u32, StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct StoredMemory {
    n_occurrences: u32,
    last_occurrence: i64,
    alpha: f64,
    beta: f64,
}

#[derive(Debug, Clone)]
struct StoredAnswer {
    id: u64,
    user: String,
    record: AnswerRecord,
}

type CounterKey = (String, u64, NaiveDate);

#[derive(Debug, Default)]
struct Ids {
    deck: i64,
    vocabulary: i64,
    quiz: u64,
    answer: u64,
}

/// In-process backend implementing every store contract.
///
/// Interior locks provide the atomicity the contracts demand: one mutex
/// guards all quiz pools (the exclusive-access guarantee of
/// [`QuizStore::with_quiz`]) and the counter maps increment under their own
/// locks.
#[derive(Default)]
pub struct InMemoryStore {
    vocabulary: RwLock<HashMap<i64, VocabularyRow>>,
    decks: RwLock<HashMap<i64, Vec<i64>>>,
    memory: RwLock<HashMap<(String, i64), StoredMemory>>,
    quizzes: Mutex<HashMap<u64, QuizPool>>,
    history: RwLock<HashMap<String, Vec<QuizHistoryEntry>>>,
    answers: RwLock<Vec<StoredAnswer>>,
    review_counters: Mutex<HashMap<CounterKey, u32>>,
    minute_counters: Mutex<HashMap<CounterKey, u32>>,
    ids: Mutex<Ids>,
    busy_fuse: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty deck and return its id.
    pub fn create_deck(&self) -> i64 {
        let id = {
            let mut ids = self.ids.lock();
            ids.deck += 1;
            ids.deck
        };
        self.decks.write().insert(id, Vec::new());
        id
    }

    /// Add a word pair to a deck and return its vocabulary id.
    pub fn add_word(
        &self,
        deck_id: i64,
        source: &str,
        target: &str,
    ) -> Result<i64, StoreError> {
        let id = {
            let mut ids = self.ids.lock();
            ids.vocabulary += 1;
            ids.vocabulary
        };
        {
            let mut decks = self.decks.write();
            let deck = decks
                .get_mut(&deck_id)
                .ok_or_else(|| StoreError::NotFound(format!("deck {deck_id}")))?;
            deck.push(id);
        }
        self.vocabulary.write().insert(
            id,
            VocabularyRow {
                id,
                source_word: source.to_string(),
                target_word: target.to_string(),
            },
        );
        Ok(id)
    }

    /// Logged answers of a user, oldest first.
    pub fn answers_for(&self, user: &str) -> Vec<AnswerRecord> {
        self.answers
            .read()
            .iter()
            .filter(|stored| stored.user == user)
            .map(|stored| stored.record.clone())
            .collect()
    }

    /// One logged answer by id.
    pub fn answer(&self, id: u64) -> Option<AnswerRecord> {
        self.answers
            .read()
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| stored.record.clone())
    }

    /// Make the next `times` memory-store calls fail with [`StoreError::Busy`].
    ///
    /// Test fixture for the retry contract.
    pub fn fail_busy(&self, times: u32) {
        self.busy_fuse.store(times, Ordering::SeqCst);
    }

    fn take_busy(&self) -> Result<(), StoreError> {
        let mut remaining = self.busy_fuse.load(Ordering::SeqCst);
        while remaining > 0 {
            match self.busy_fuse.compare_exchange(
                remaining,
                remaining - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Err(StoreError::Busy),
                Err(actual) => remaining = actual,
            }
        }
        Ok(())
    }
}

impl VocabularyStore for InMemoryStore {
    fn vocabulary(&self, id: i64) -> Result<VocabularyRow, StoreError> {
        self.vocabulary
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vocabulary {id}")))
    }

    fn deck_vocabulary(&self, deck_id: i64) -> Result<Vec<VocabularyRow>, StoreError> {
        let decks = self.decks.read();
        let deck = decks
            .get(&deck_id)
            .ok_or_else(|| StoreError::NotFound(format!("deck {deck_id}")))?;
        let vocabulary = self.vocabulary.read();
        Ok(deck
            .iter()
            .filter_map(|id| vocabulary.get(id).cloned())
            .collect())
    }
}

impl MemoryStore for InMemoryStore {
    fn load_memory(&self, user: &str) -> Result<Vec<MemoryRow>, StoreError> {
        self.take_busy()?;
        let vocabulary = self.vocabulary.read();
        let rows = self
            .memory
            .read()
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .filter_map(|((_, vocab_id), stored)| {
                vocabulary.get(vocab_id).map(|v| MemoryRow {
                    vocabulary_id: *vocab_id,
                    source_word: v.source_word.clone(),
                    target_word: v.target_word.clone(),
                    n_occurrences: stored.n_occurrences,
                    last_occurrence: stored.last_occurrence,
                    alpha: stored.alpha,
                    beta: stored.beta,
                })
            })
            .collect();
        Ok(rows)
    }

    fn upsert_memory(&self, user: &str, row: &MemoryRow) -> Result<(), StoreError> {
        self.take_busy()?;
        if !self.vocabulary.read().contains_key(&row.vocabulary_id) {
            return Err(StoreError::NotFound(format!(
                "vocabulary {}",
                row.vocabulary_id
            )));
        }
        self.memory.write().insert(
            (user.to_string(), row.vocabulary_id),
            StoredMemory {
                n_occurrences: row.n_occurrences,
                last_occurrence: row.last_occurrence,
                alpha: row.alpha,
                beta: row.beta,
            },
        );
        Ok(())
    }
}

impl QuizStore for InMemoryStore {
    fn quiz_candidates(&self, user: &str) -> Result<Vec<VocabularyRow>, StoreError> {
        let claimed: HashSet<i64> = self
            .quizzes
            .lock()
            .values()
            .filter(|pool| pool.user == user)
            .flat_map(|pool| pool.vocabulary_ids())
            .collect();
        let vocabulary = self.vocabulary.read();
        Ok(self
            .memory
            .read()
            .keys()
            .filter(|(owner, vocab_id)| owner == user && !claimed.contains(vocab_id))
            .filter_map(|(_, vocab_id)| vocabulary.get(vocab_id).cloned())
            .collect())
    }

    fn insert_quiz(
        &self,
        user: &str,
        name: &str,
        vocabulary_ids: &[i64],
    ) -> Result<QuizPool, StoreError> {
        {
            let vocabulary = self.vocabulary.read();
            for id in vocabulary_ids {
                if !vocabulary.contains_key(id) {
                    return Err(StoreError::NotFound(format!("vocabulary {id}")));
                }
            }
        }
        let id = {
            let mut ids = self.ids.lock();
            ids.quiz += 1;
            ids.quiz
        };
        let pool = QuizPool::new(id, user, name, vocabulary_ids);
        self.quizzes.lock().insert(id, pool.clone());
        Ok(pool)
    }

    fn quiz(&self, quiz_id: u64) -> Result<QuizPool, StoreError> {
        self.quizzes
            .lock()
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("quiz {quiz_id}")))
    }

    fn with_quiz<T>(
        &self,
        quiz_id: u64,
        f: impl FnOnce(&mut QuizPool) -> T,
    ) -> Result<T, StoreError> {
        let mut quizzes = self.quizzes.lock();
        let pool = quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| StoreError::NotFound(format!("quiz {quiz_id}")))?;
        Ok(f(pool))
    }

    fn append_history(&self, user: &str, entry: QuizHistoryEntry) -> Result<(), StoreError> {
        self.history
            .write()
            .entry(user.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    fn attempt_count(&self, user: &str, name: &str) -> Result<u32, StoreError> {
        Ok(self
            .history
            .read()
            .get(user)
            .map(|entries| entries.iter().filter(|e| e.name == name).count() as u32)
            .unwrap_or(0))
    }
}

impl AnswerStore for InMemoryStore {
    fn append_answer(&self, user: &str, record: AnswerRecord) -> Result<u64, StoreError> {
        let id = {
            let mut ids = self.ids.lock();
            ids.answer += 1;
            ids.answer
        };
        self.answers.write().push(StoredAnswer {
            id,
            user: user.to_string(),
            record,
        });
        Ok(id)
    }
}

impl ProgressStore for InMemoryStore {
    fn add_reviews(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
        count: u32,
    ) -> Result<u32, StoreError> {
        let mut counters = self.review_counters.lock();
        let total = counters
            .entry((user.to_string(), session_id, date))
            .or_insert(0);
        *total += count;
        Ok(*total)
    }

    fn add_minutes(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<u32, StoreError> {
        let mut counters = self.minute_counters.lock();
        let total = counters
            .entry((user.to_string(), session_id, date))
            .or_insert(0);
        *total += minutes;
        Ok(*total)
    }

    fn reviews_on(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
    ) -> Result<u32, StoreError> {
        Ok(*self
            .review_counters
            .lock()
            .get(&(user.to_string(), session_id, date))
            .unwrap_or(&0))
    }

    fn minutes_on(
        &self,
        user: &str,
        session_id: u64,
        date: NaiveDate,
    ) -> Result<u32, StoreError> {
        Ok(*self
            .minute_counters
            .lock()
            .get(&(user.to_string(), session_id, date))
            .unwrap_or(&0))
    }
}

/// Session-cache style memory backend.
///
/// Keeps each user's memory rows in process memory the way a web session
/// cache would, behind the same [`MemoryStore`] contract as a database
/// adapter. Rows disappear with the cache; nothing here is durable.
#[derive(Default)]
pub struct SnapshotCache {
    rows: RwLock<HashMap<String, HashMap<i64, MemoryRow>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user's cached memory.
    pub fn evict(&self, user: &str) {
        self.rows.write().remove(user);
    }
}

impl MemoryStore for SnapshotCache {
    fn load_memory(&self, user: &str) -> Result<Vec<MemoryRow>, StoreError> {
        Ok(self
            .rows
            .read()
            .get(user)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_memory(&self, user: &str, row: &MemoryRow) -> Result<(), StoreError> {
        self.rows
            .write()
            .entry(user.to_string())
            .or_default()
            .insert(row.vocabulary_id, row.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_rows_keep_insertion_order() {
        let store = InMemoryStore::new();
        let deck = store.create_deck();
        let a = store.add_word(deck, "dog", "hund").unwrap();
        let b = store.add_word(deck, "cat", "katze").unwrap();
        let rows = store.deck_vocabulary(deck).unwrap();
        assert_eq!(
            rows.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![a, b]
        );
    }

    #[test]
    fn test_unknown_deck_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.deck_vocabulary(99),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_rejects_unknown_vocabulary() {
        let store = InMemoryStore::new();
        let row = MemoryRow {
            vocabulary_id: 123,
            source_word: "dog".into(),
            target_word: "hund".into(),
            n_occurrences: 1,
            last_occurrence: 0,
            alpha: 0.1,
            beta: 0.5,
        };
        assert!(matches!(
            store.upsert_memory("ada", &row),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_busy_fuse_trips_then_clears() {
        let store = InMemoryStore::new();
        store.fail_busy(2);
        assert!(matches!(store.load_memory("ada"), Err(StoreError::Busy)));
        assert!(matches!(store.load_memory("ada"), Err(StoreError::Busy)));
        assert!(store.load_memory("ada").is_ok());
    }

    #[test]
    fn test_counters_accumulate() {
        let store = InMemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(store.add_reviews("ada", 1, date, 1).unwrap(), 1);
        assert_eq!(store.add_reviews("ada", 1, date, 1).unwrap(), 2);
        assert_eq!(store.reviews_on("ada", 1, date).unwrap(), 2);
        assert_eq!(store.minutes_on("ada", 1, date).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_cache_round_trip() {
        let cache = SnapshotCache::new();
        let row = MemoryRow {
            vocabulary_id: 7,
            source_word: "dog".into(),
            target_word: "hund".into(),
            n_occurrences: 2,
            last_occurrence: 100,
            alpha: 0.1,
            beta: 0.5,
        };
        cache.upsert_memory("ada", &row).unwrap();
        let rows = cache.load_memory("ada").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].n_occurrences, 2);
        cache.evict("ada");
        assert!(cache.load_memory("ada").unwrap().is_empty());
    }
}
