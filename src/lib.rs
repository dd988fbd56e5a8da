//! # wortschatz-core - scheduling and memory core for vocabulary learning
//!
//! This crate is the decision-making heart of a flashcard application: given
//! a user's exposure history it estimates what they still remember, chooses
//! which word to show next, and keeps that state in sync with an external
//! store. The surrounding web application (routing, rendering, accounts,
//! deck CRUD) is a caller, not a concern of this crate.
//!
//! - **Memory model** - a single exponential forgetting curve:
//!   `P = exp(-alpha * (1-beta)^n * Δt)`. Repetition shrinks the decay rate;
//!   `alpha = 0` models material that is never forgotten.
//! - **Learner** - owns the per-user memory states, simulates recall,
//!   snapshots to JSON, and round-trips rows through the store under a
//!   bounded retry policy.
//! - **Planner** - interchangeable selection policies behind one trait;
//!   uniform-random baseline plus deck seeding from a frequency list.
//! - **Quiz** - bounded pools sampled from learned words, with atomic
//!   pick-and-increment, score history, and restart.
//! - **Sessions** - daily minute/review goals with atomic counters.
//!
//! All durable state lives behind the narrow store traits in [`store`]; the
//! crate performs no I/O of its own beyond the retry sleep.

pub mod answer;
pub mod config;
pub mod error;
pub mod item;
pub mod learner;
pub mod memory;
pub mod planner;
pub mod quiz;
pub mod retry;
pub mod session;
pub mod store;
pub mod teaching;

pub use config::EngineConfig;
pub use error::EngineError;
pub use item::WordItem;
pub use learner::{Learner, MemorySnapshot};
pub use memory::MemoryState;
pub use planner::{
    EmptyPlanningContext, FixedHorizonContext, FixedLearnerContext, Planner, PlanningContext,
    RandomPlanner, WordSource,
};
pub use quiz::{QuizHistoryEntry, QuizPick, QuizPool, QuizStatus};
pub use retry::RetryPolicy;
pub use session::{ActiveSession, GoalType, SessionProgress, StudySession};
pub use store::{
    AnswerRecord, AnswerStore, InMemoryStore, MemoryRow, MemoryStore, ProgressStore, QuizStore,
    SnapshotCache, StoreError, VocabularyRow, VocabularyStore,
};
pub use teaching::{AnswerOutcome, SelectionOutcome, Teacher};
