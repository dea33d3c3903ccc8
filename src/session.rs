use crate::error::ExamError;
use crate::models::{OptionLabel, QuestionRecord, ResultRecord, ScoreSummary, TimerSettings};
use crate::scoring;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_QUESTIONS_PER_EXAM: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Previous,
    Next,
}

/// Draws `min(count, pool.len())` distinct questions in random order.
pub fn assign_questions<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    count: usize,
    rng: &mut R,
) -> Vec<QuestionRecord> {
    pool.choose_multiple(rng, count.min(pool.len()))
        .cloned()
        .collect()
}

/// One student's attempt.
///
/// A session is created in `NotStarted` and only leaves it through a
/// successful [`StudentSession::start`]. Once `Finished` it never changes
/// again; the score is computed on that transition and kept in `summary`.
#[derive(Debug, Clone)]
pub struct StudentSession {
    pub id: Uuid,
    pub roll_number: String,
    pub name: String,
    state: SessionState,
    assigned: Vec<QuestionRecord>,
    current_index: usize,
    answers: BTreeMap<usize, OptionLabel>,
    start_time: Option<DateTime<Utc>>,
    timer: Option<TimerSettings>,
    summary: Option<ScoreSummary>,
}

impl StudentSession {
    pub fn new(roll_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            roll_number: roll_number.into(),
            name: name.into(),
            state: SessionState::NotStarted,
            assigned: Vec::new(),
            current_index: 0,
            answers: BTreeMap::new(),
            start_time: None,
            timer: None,
            summary: None,
        }
    }

    /// Checks `code` against the active exam code and, on a match, samples
    /// the question set and starts the clock.
    #[allow(clippy::too_many_arguments)]
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        code: &str,
        active_code: Option<&str>,
        timer: Option<TimerSettings>,
        pool: &[QuestionRecord],
        question_count: usize,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), ExamError> {
        if self.state != SessionState::NotStarted {
            return Err(ExamError::AlreadyStarted);
        }
        if active_code != Some(code) {
            return Err(ExamError::InvalidCode);
        }
        self.assigned = assign_questions(pool, question_count, rng);
        self.current_index = 0;
        self.answers.clear();
        self.start_time = Some(now);
        self.timer = timer;
        self.state = SessionState::InProgress;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn assigned_questions(&self) -> &[QuestionRecord] {
        &self.assigned
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.assigned.get(self.current_index)
    }

    pub fn answers(&self) -> &BTreeMap<usize, OptionLabel> {
        &self.answers
    }

    pub fn answer_at(&self, index: usize) -> Option<OptionLabel> {
        self.answers.get(&index).copied()
    }

    pub fn summary(&self) -> Option<&ScoreSummary> {
        self.summary.as_ref()
    }

    fn ensure_in_progress(&self) -> Result<(), ExamError> {
        if self.state == SessionState::InProgress {
            Ok(())
        } else {
            Err(ExamError::NotInProgress)
        }
    }

    /// Records or overwrites the answer at `index`. Position is unchanged.
    pub fn select_answer(&mut self, index: usize, letter: OptionLabel) -> Result<(), ExamError> {
        self.ensure_in_progress()?;
        if index >= self.assigned.len() {
            return Err(ExamError::QuestionOutOfRange {
                index,
                total: self.assigned.len(),
            });
        }
        self.answers.insert(index, letter);
        Ok(())
    }

    /// Moves one question back or forward; a move past either end is ignored.
    pub fn navigate(&mut self, direction: Direction) -> Result<usize, ExamError> {
        self.ensure_in_progress()?;
        match direction {
            Direction::Previous if self.current_index > 0 => self.current_index -= 1,
            Direction::Next if self.current_index + 1 < self.assigned.len() => self.current_index += 1,
            _ => {}
        }
        Ok(self.current_index)
    }

    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.start_time
            .map(|start| (now - start).num_minutes())
            .unwrap_or(0)
    }

    /// Whole minutes left on the timer, or `None` when the exam is untimed.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.timer
            .map(|t| i64::from(t.duration_minutes) - self.elapsed_minutes(now))
    }

    /// Deadline check. Returns the result record when this call is what
    /// finished the exam; untimed or already finished sessions are left alone.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<ResultRecord> {
        if self.state != SessionState::InProgress {
            return None;
        }
        match self.remaining_minutes(now) {
            Some(remaining) if remaining <= 0 => Some(self.finish(now)),
            _ => None,
        }
    }

    /// Ends the exam regardless of how many questions were answered.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<ResultRecord, ExamError> {
        self.ensure_in_progress()?;
        Ok(self.finish(now))
    }

    fn finish(&mut self, now: DateTime<Utc>) -> ResultRecord {
        let summary = scoring::score(&self.assigned, &self.answers);
        let record = ResultRecord {
            roll_number: self.roll_number.clone(),
            name: self.name.clone(),
            score: summary.score,
            submit_time: now,
        };
        self.state = SessionState::Finished;
        self.summary = Some(summary);
        record
    }
}
