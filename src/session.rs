//! Study sessions, daily goals, and progress tracking.
//!
//! A study session scopes a goal (minutes per day, reviews per day, or a
//! quiz) to a date window. Daily progress lives in the store's counters;
//! the increments are atomic per `(user, session, date)` key so concurrent
//! requests cannot lose updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::store::ProgressStore;

/// What a study session is counting toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    MinutesPerDay,
    ReviewsPerDay,
    Quiz,
}

/// A user's study session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: u64,
    pub user: String,
    pub name: String,
    pub goal_type: GoalType,
    pub goal_value: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    /// Deck backing a review session.
    pub deck_id: Option<i64>,
    /// Pool backing a quiz session.
    pub quiz_id: Option<u64>,
}

impl StudySession {
    /// Calendar length of the session, inclusive of both ends.
    pub fn days_total(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn is_running_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.start_date <= today && today <= self.end_date
    }
}

/// Today's progress toward a session goal.
#[derive(Debug, Clone, Serialize)]
pub struct SessionProgress {
    pub goal_type: GoalType,
    pub goal_value: u32,
    pub progress: u32,
    pub done: bool,
    pub is_running_today: bool,
}

/// Begin an interaction with a session.
///
/// Outside its date window this is an input error. Review-goal sessions
/// count the start as one review.
pub fn start_session<S: ProgressStore>(
    store: &S,
    session: &StudySession,
    today: NaiveDate,
) -> Result<(), EngineError> {
    if !session.is_running_on(today) {
        return Err(EngineError::InvalidInput(
            "study session has ended or has not started yet".into(),
        ));
    }
    if session.goal_type == GoalType::ReviewsPerDay {
        store.add_reviews(&session.user, session.id, today, 1)?;
    }
    Ok(())
}

/// Wall-clock tracker for an active minutes-per-day session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub session_id: u64,
    /// Epoch seconds when tracking (re)started.
    pub started_at: i64,
}

impl ActiveSession {
    pub fn new(session_id: u64, started_at: i64) -> Self {
        Self {
            session_id,
            started_at,
        }
    }

    pub fn elapsed_seconds(&self, now: i64) -> i64 {
        (now - self.started_at).max(0)
    }

    pub fn elapsed_minutes(&self, now: i64) -> u32 {
        (self.elapsed_seconds(now) / 60) as u32
    }
}

/// Flush whole elapsed minutes into today's counter.
///
/// The start mark advances by exactly the flushed amount, so seconds still
/// in progress are carried into the next flush rather than lost. Returns
/// the minutes credited; sessions with other goal types credit nothing.
pub fn flush_minutes<S: ProgressStore>(
    store: &S,
    session: &StudySession,
    active: &mut ActiveSession,
    now: i64,
    today: NaiveDate,
) -> Result<u32, EngineError> {
    if session.goal_type != GoalType::MinutesPerDay {
        return Ok(0);
    }
    let full_minutes = active.elapsed_minutes(now);
    if full_minutes == 0 {
        return Ok(0);
    }
    store.add_minutes(&session.user, session.id, today, full_minutes)?;
    active.started_at += i64::from(full_minutes) * 60;
    Ok(full_minutes)
}

/// End an active session: credit any remaining whole minutes and report the
/// total credited by this call.
pub fn end_session<S: ProgressStore>(
    store: &S,
    session: &StudySession,
    active: &mut ActiveSession,
    now: i64,
    today: NaiveDate,
) -> Result<u32, EngineError> {
    flush_minutes(store, session, active, now, today)
}

/// Today's progress for a session.
///
/// Review goals read the review counter, minute goals the minute counter.
/// Quiz sessions report through [`crate::quiz::quiz_status`]; their daily
/// counters are always zero here.
pub fn progress<S: ProgressStore>(
    store: &S,
    session: &StudySession,
    today: NaiveDate,
) -> Result<SessionProgress, EngineError> {
    let progress = match session.goal_type {
        GoalType::ReviewsPerDay => store.reviews_on(&session.user, session.id, today)?,
        _ => store.minutes_on(&session.user, session.id, today)?,
    };
    Ok(SessionProgress {
        goal_type: session.goal_type,
        goal_value: session.goal_value,
        progress,
        done: progress >= session.goal_value,
        is_running_today: session.is_running_on(today),
    })
}
