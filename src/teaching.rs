//! Teaching-session orchestration.
//!
//! [`Teacher`] binds material, a selection policy, and a planning context
//! into the basic choose/answer cycle used by simulations. The free
//! functions below are the production request/response cycle: pick the next
//! word for a study session, grade a submitted answer, and keep the user's
//! memory and quiz bookkeeping current in the external store. Learner state
//! is not kept resident between calls; every interaction reloads it from
//! the store and writes it back.

use serde::Serialize;

use crate::answer::answers_match;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::item::WordItem;
use crate::learner::Learner;
use crate::planner::{Planner, PlanningContext};
use crate::quiz::next_quiz_question;
use crate::session::StudySession;
use crate::store::{AnswerRecord, AnswerStore, MemoryStore, QuizStore, VocabularyStore};

/// What the presentation layer renders next: a question, or the end of a
/// quiz.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum SelectionOutcome {
    #[serde(rename = "ok")]
    Question {
        word: String,
        translation: String,
        question_id: i64,
    },
    #[serde(rename = "done")]
    Complete { score: u32, total: u32 },
}

/// Grading result for one submitted answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    #[serde(flatten)]
    pub quiz: Option<QuizCounters>,
}

/// Quiz accounting after an answer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuizCounters {
    pub score: u32,
    pub asked_count: u32,
    pub total: u32,
    pub done: bool,
}

/// Binds material, a planner, and a planning context.
pub struct Teacher {
    material: Vec<WordItem>,
    planner: Box<dyn Planner>,
    context: Box<dyn PlanningContext>,
}

impl Teacher {
    /// Material must be non-empty and every question non-blank.
    pub fn new(
        material: Vec<WordItem>,
        planner: Box<dyn Planner>,
        context: Box<dyn PlanningContext>,
    ) -> Result<Self, EngineError> {
        if material.is_empty() {
            return Err(EngineError::InvalidInput(
                "material must be a non-empty list of teaching items".into(),
            ));
        }
        if material.iter().any(|item| item.question().trim().is_empty()) {
            return Err(EngineError::InvalidInput(
                "material contains an item with a blank question".into(),
            ));
        }
        Ok(Self {
            material,
            planner,
            context,
        })
    }

    /// Ask the planner for the next item.
    pub fn choose_item(&mut self, time: i64) -> Result<WordItem, EngineError> {
        self.planner
            .choose_item(&self.material, &mut *self.context, time)
            .cloned()
    }

    /// Feed the reply to an asked item back into the planning context.
    pub fn gets_answer(
        &mut self,
        item: &WordItem,
        answer: Option<&str>,
        time: i64,
    ) -> Result<(), EngineError> {
        self.context.update(item, answer, time)
    }
}

/// Pick the next word for a study session.
///
/// Quiz sessions take the atomic pool-pick path and may return the
/// completion signal. Deck sessions select via the planner, then run the
/// learn-and-persist cycle: reload the user's learner from the store, apply
/// the exposure, save it back (both legs under the retry policy).
pub fn next_question<S>(
    store: &S,
    config: &EngineConfig,
    planner: &mut dyn Planner,
    context: &mut dyn PlanningContext,
    session: &StudySession,
    now: i64,
) -> Result<SelectionOutcome, EngineError>
where
    S: VocabularyStore + MemoryStore + QuizStore,
{
    if let Some(quiz_id) = session.quiz_id {
        let mut rng = rand::thread_rng();
        return next_quiz_question(store, &session.user, quiz_id, &mut rng);
    }

    let deck_id = session.deck_id.ok_or_else(|| {
        EngineError::InvalidInput("study session has neither a deck nor a quiz".into())
    })?;
    let rows = store.deck_vocabulary(deck_id)?;
    if rows.is_empty() {
        return Err(EngineError::EmptyCandidateSet);
    }

    let items: Vec<WordItem> = rows
        .iter()
        .map(|row| WordItem::new(row.source_word.clone(), row.target_word.clone()))
        .collect();
    let chosen = planner.choose_item(&items, context, now)?.clone();
    let vocabulary_id = rows
        .iter()
        .find(|row| row.source_word == chosen.source)
        .map(|row| row.id)
        .ok_or_else(|| EngineError::NotFound(format!("vocabulary for {}", chosen.source)))?;

    let mut learner = Learner::load_from_store(
        store,
        &session.user,
        config.alpha,
        config.beta,
        &config.retry,
    )?;
    learner.learn(&chosen, Some(vocabulary_id), now)?;
    learner.save_to_store(store, &session.user, &config.retry)?;

    Ok(SelectionOutcome::Question {
        word: chosen.source,
        translation: chosen.target,
        question_id: vocabulary_id,
    })
}

/// Grade a submitted answer, log it, and update quiz accounting.
pub fn submit_answer<S>(
    store: &S,
    session: &StudySession,
    question_id: i64,
    given_answer: &str,
) -> Result<AnswerOutcome, EngineError>
where
    S: VocabularyStore + QuizStore + AnswerStore,
{
    let vocabulary = store.vocabulary(question_id)?;
    let is_correct = answers_match(given_answer, &vocabulary.target_word);

    store.append_answer(
        &session.user,
        AnswerRecord {
            vocabulary_id: question_id,
            quiz_id: session.quiz_id,
            given_answer: given_answer.to_string(),
            is_correct,
        },
    )?;

    let Some(quiz_id) = session.quiz_id else {
        return Ok(AnswerOutcome {
            is_correct,
            quiz: None,
        });
    };

    let counters = store.with_quiz(quiz_id, |pool| {
        pool.record_answer(is_correct);
        QuizCounters {
            score: pool.score,
            asked_count: pool.asked_count,
            total: pool.question_count,
            done: pool.is_complete(),
        }
    })?;

    Ok(AnswerOutcome {
        is_correct,
        quiz: Some(counters),
    })
}
