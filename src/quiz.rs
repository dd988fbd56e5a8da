//! Bounded quiz sessions over a pre-sampled pool of learned words.
//!
//! A pool is drawn once, without replacement, from the words a user has
//! already learned. Each selection atomically takes one not-yet-asked item
//! and advances `asked_count`; once `asked_count` reaches `question_count`
//! the pool is exhausted, the final score is written to the history log, the
//! asked flags are cleared for a future pass, and further selections return
//! a completion signal instead of an item.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::store::{QuizStore, VocabularyStore};
use crate::teaching::SelectionOutcome;

/// One pool entry with its pool-local asked flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizEntry {
    pub vocabulary_id: i64,
    pub asked: bool,
}

/// A quiz pool and its counters.
///
/// The transition methods are pure state manipulation; callers are expected
/// to hold the store's exclusive pool access
/// ([`QuizStore::with_quiz`]) around them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizPool {
    pub id: u64,
    pub user: String,
    pub name: String,
    pub question_count: u32,
    pub asked_count: u32,
    pub score: u32,
    entries: Vec<QuizEntry>,
    history_recorded: bool,
}

/// Result of one pool selection.
#[derive(Debug, Clone)]
pub enum QuizPick {
    /// An item was taken and marked asked.
    Question(i64),
    /// The pool is exhausted.
    Complete {
        score: u32,
        total: u32,
        /// Set on the first selection after exhaustion; the caller writes
        /// the history entry exactly once per pass.
        just_finished: bool,
    },
}

impl QuizPool {
    pub fn new(id: u64, user: &str, name: &str, vocabulary_ids: &[i64]) -> Self {
        Self {
            id,
            user: user.to_string(),
            name: name.to_string(),
            question_count: vocabulary_ids.len() as u32,
            asked_count: 0,
            score: 0,
            entries: vocabulary_ids
                .iter()
                .map(|&vocabulary_id| QuizEntry {
                    vocabulary_id,
                    asked: false,
                })
                .collect(),
            history_recorded: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.asked_count >= self.question_count
    }

    pub fn vocabulary_ids(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.vocabulary_id).collect()
    }

    /// Take one not-yet-asked item, mark it asked, advance `asked_count`.
    ///
    /// On an exhausted pool this clears the asked flags (so a restart or the
    /// next pass starts fresh) and reports whether the exhaustion is being
    /// observed for the first time.
    pub fn pick(&mut self, rng: &mut impl Rng) -> QuizPick {
        if self.is_complete() {
            let just_finished = !self.history_recorded;
            self.history_recorded = true;
            for entry in &mut self.entries {
                entry.asked = false;
            }
            return QuizPick::Complete {
                score: self.score,
                total: self.question_count,
                just_finished,
            };
        }

        let unasked: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.asked)
            .map(|(i, _)| i)
            .collect();
        // question_count == entries.len(), so an incomplete pool always has
        // an unasked entry.
        match unasked.choose(rng) {
            Some(&index) => {
                self.entries[index].asked = true;
                self.asked_count += 1;
                QuizPick::Question(self.entries[index].vocabulary_id)
            }
            None => QuizPick::Complete {
                score: self.score,
                total: self.question_count,
                just_finished: false,
            },
        }
    }

    /// Record a graded answer for this pool.
    pub fn record_answer(&mut self, correct: bool) {
        if correct {
            self.score += 1;
        }
    }

    /// Back to `Active` with zeroed counters and all items eligible again.
    pub fn restart(&mut self) {
        self.asked_count = 0;
        self.score = 0;
        self.history_recorded = false;
        for entry in &mut self.entries {
            entry.asked = false;
        }
    }
}

/// One completed quiz pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizHistoryEntry {
    pub name: String,
    pub score: u32,
    pub question_count: u32,
    pub attempt: u32,
}

/// Completion state of a quiz, for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct QuizStatus {
    pub is_complete: bool,
    pub score: u32,
    pub total: u32,
}

/// Sample a new quiz pool from the user's learned words.
///
/// Sampling is without replacement over the tracked memory items no other
/// quiz has claimed; asking for more questions than there are candidates is
/// an input error, reported with the available count.
pub fn create_quiz<S: QuizStore>(
    store: &S,
    user: &str,
    name: &str,
    question_count: u32,
    rng: &mut impl Rng,
) -> Result<QuizPool, EngineError> {
    let candidates = store.quiz_candidates(user)?;
    if (candidates.len() as u32) < question_count {
        return Err(EngineError::InvalidInput(format!(
            "not enough words in memory: {} learned, {} questions requested",
            candidates.len(),
            question_count
        )));
    }
    let chosen: Vec<i64> = candidates
        .choose_multiple(rng, question_count as usize)
        .map(|row| row.id)
        .collect();
    let pool = store.insert_quiz(user, name, &chosen)?;
    tracing::debug!(user, quiz = pool.id, questions = question_count, "quiz pool created");
    Ok(pool)
}

/// Atomically take the next question from a pool, or signal completion.
///
/// The first selection after exhaustion snapshots the final score into the
/// user's history (attempt numbers continue per quiz name).
pub fn next_quiz_question<S: QuizStore + VocabularyStore>(
    store: &S,
    user: &str,
    quiz_id: u64,
    rng: &mut impl Rng,
) -> Result<SelectionOutcome, EngineError> {
    let (pick, name) = store.with_quiz(quiz_id, |pool| (pool.pick(rng), pool.name.clone()))?;
    match pick {
        QuizPick::Question(vocabulary_id) => {
            let row = store.vocabulary(vocabulary_id)?;
            Ok(SelectionOutcome::Question {
                word: row.source_word,
                translation: row.target_word,
                question_id: row.id,
            })
        }
        QuizPick::Complete {
            score,
            total,
            just_finished,
        } => {
            if just_finished {
                let attempt = store.attempt_count(user, &name)? + 1;
                store.append_history(
                    user,
                    QuizHistoryEntry {
                        name,
                        score,
                        question_count: total,
                        attempt,
                    },
                )?;
                tracing::info!(user, quiz = quiz_id, score, total, attempt, "quiz completed");
            }
            Ok(SelectionOutcome::Complete { score, total })
        }
    }
}

/// Reset a pool for another pass.
pub fn restart_quiz<S: QuizStore>(store: &S, quiz_id: u64) -> Result<QuizPool, EngineError> {
    let pool = store.with_quiz(quiz_id, |pool| {
        pool.restart();
        pool.clone()
    })?;
    tracing::debug!(quiz = quiz_id, "quiz pool restarted");
    Ok(pool)
}

/// Current completion state of a pool.
pub fn quiz_status<S: QuizStore>(store: &S, quiz_id: u64) -> Result<QuizStatus, EngineError> {
    let pool = store.quiz(quiz_id)?;
    Ok(QuizStatus {
        is_complete: pool.is_complete(),
        score: pool.score,
        total: pool.question_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_pool_delivers_each_item_once_per_pass() {
        let mut pool = QuizPool::new(1, "ada", "week 1", &[10, 11, 12]);
        let mut rng = rng();
        let mut seen = Vec::new();
        for _ in 0..3 {
            match pool.pick(&mut rng) {
                QuizPick::Question(id) => seen.push(id),
                QuizPick::Complete { .. } => panic!("pool exhausted early"),
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![10, 11, 12]);
        assert_eq!(pool.asked_count, 3);
        assert!(pool.is_complete());
    }

    #[test]
    fn test_exhausted_pool_signals_completion_once() {
        let mut pool = QuizPool::new(1, "ada", "week 1", &[10, 11]);
        let mut rng = rng();
        pool.pick(&mut rng);
        pool.pick(&mut rng);
        pool.record_answer(true);

        match pool.pick(&mut rng) {
            QuizPick::Complete {
                score,
                total,
                just_finished,
            } => {
                assert_eq!(score, 1);
                assert_eq!(total, 2);
                assert!(just_finished);
            }
            QuizPick::Question(_) => panic!("expected completion"),
        }
        match pool.pick(&mut rng) {
            QuizPick::Complete { just_finished, .. } => assert!(!just_finished),
            QuizPick::Question(_) => panic!("expected completion"),
        }
    }

    #[test]
    fn test_restart_makes_items_eligible_again() {
        let mut pool = QuizPool::new(1, "ada", "week 1", &[10, 11]);
        let mut rng = rng();
        pool.pick(&mut rng);
        pool.pick(&mut rng);
        pool.record_answer(true);
        assert!(pool.is_complete());

        pool.restart();
        assert_eq!(pool.asked_count, 0);
        assert_eq!(pool.score, 0);
        assert!(!pool.is_complete());
        assert!(matches!(pool.pick(&mut rng), QuizPick::Question(_)));
    }

    #[test]
    fn test_score_only_counts_correct_answers() {
        let mut pool = QuizPool::new(1, "ada", "week 1", &[10]);
        pool.record_answer(false);
        pool.record_answer(true);
        assert_eq!(pool.score, 1);
    }
}
