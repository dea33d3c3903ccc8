use crate::error::ExamError;
use crate::faculty::FacultyDirectory;
use crate::models::{
    ExamConfig, OptionLabel, QuestionRecord, RankedRow, ResultRecord, ScoreSummary, TimerSettings,
};
use crate::parser::{PatternParser, QuestionParser};
use crate::scoring;
use crate::session::{Direction, SessionState, StudentSession, DEFAULT_QUESTIONS_PER_EXAM};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 180;
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Timer settings as entered by faculty; the duration defaults to 30 minutes.
pub fn timer_settings(enabled: bool, duration_minutes: Option<u32>) -> Result<Option<TimerSettings>, ExamError> {
    if !enabled {
        return Ok(None);
    }
    let duration_minutes = duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(ExamError::InvalidTimer {
            min: MIN_DURATION_MINUTES,
            max: MAX_DURATION_MINUTES,
        });
    }
    Ok(Some(TimerSettings { duration_minutes }))
}

pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("CA{}", rng.gen_range(100_000..=999_999))
}

/// Faculty-owned exam data: the question pool, the active code and the
/// history of completed attempts.
#[derive(Debug, Clone)]
pub struct ExamContext {
    questions: Vec<QuestionRecord>,
    config: Option<ExamConfig>,
    results: Vec<ResultRecord>,
    questions_per_exam: usize,
}

impl Default for ExamContext {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS_PER_EXAM)
    }
}

impl ExamContext {
    pub fn new(questions_per_exam: usize) -> Self {
        Self {
            questions: Vec::new(),
            config: None,
            results: Vec::new(),
            questions_per_exam,
        }
    }

    /// Replaces the question pool and returns how many questions were found.
    pub fn load_questions(&mut self, parser: &dyn QuestionParser, paragraphs: &[String]) -> usize {
        self.questions = parser.parse_paragraphs(paragraphs);
        let degraded = self.questions.iter().filter(|q| q.is_degraded()).count();
        info!(count = self.questions.len(), degraded, "question pool loaded");
        self.questions.len()
    }

    /// Issues a fresh code, replacing any previous one. Sessions that already
    /// started keep running; new logins must use the new code.
    pub fn generate_exam_code<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        timer: Option<TimerSettings>,
    ) -> &ExamConfig {
        let config = ExamConfig {
            code: generate_code(rng),
            timer,
        };
        info!(code = %config.code, timer_enabled = config.timer_enabled(), "exam code generated");
        self.config.insert(config)
    }

    pub fn start_session<R: Rng + ?Sized>(
        &self,
        session: &mut StudentSession,
        code: &str,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), ExamError> {
        let active_code = self.config.as_ref().map(|c| c.code.as_str());
        let timer = self.config.as_ref().and_then(|c| c.timer);
        session.start(code, active_code, timer, &self.questions, self.questions_per_exam, rng, now)
    }

    pub fn record_result(&mut self, record: ResultRecord) {
        self.results.push(record);
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    /// Recomputed from the whole history on every call, so podium places move
    /// as later attempts come in.
    pub fn ranked_results(&self) -> Vec<RankedRow> {
        scoring::rank(&self.results)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentAction {
    Poll,
    Answer { index: Option<usize>, letter: OptionLabel },
    Navigate(Direction),
    Submit,
}

fn apply_action(
    session: &mut StudentSession,
    action: StudentAction,
    now: DateTime<Utc>,
) -> Result<Option<ResultRecord>, ExamError> {
    match action {
        StudentAction::Poll => Ok(None),
        StudentAction::Answer { index, letter } => {
            let index = index.unwrap_or_else(|| session.current_index());
            session.select_answer(index, letter).map(|_| None)
        }
        StudentAction::Navigate(direction) => session.navigate(direction).map(|_| None),
        StudentAction::Submit => session.submit(now).map(Some),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub label: OptionLabel,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub number: usize,
    pub text: String,
    pub options: Vec<OptionView>,
    pub selected: Option<OptionLabel>,
}

/// What a student sees after each action. Answer keys are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub session_id: Uuid,
    pub roll_number: String,
    pub name: String,
    pub state: SessionState,
    pub total_questions: usize,
    pub answered: usize,
    pub question: Option<QuestionView>,
    pub has_previous: bool,
    pub has_next: bool,
    pub remaining_minutes: Option<i64>,
    pub result: Option<ScoreSummary>,
}

impl StudentView {
    pub fn build(session: &StudentSession, now: DateTime<Utc>) -> Self {
        let in_progress = session.state() == SessionState::InProgress;
        let index = session.current_index();
        let total = session.assigned_questions().len();
        let question = session
            .current_question()
            .filter(|_| in_progress)
            .map(|q| QuestionView {
                number: index + 1,
                text: q.text.clone(),
                options: OptionLabel::ALL
                    .iter()
                    .map(|label| OptionView {
                        label: *label,
                        text: q.option(*label).to_string(),
                    })
                    .collect(),
                selected: session.answer_at(index),
            });
        Self {
            session_id: session.id,
            roll_number: session.roll_number.clone(),
            name: session.name.clone(),
            state: session.state(),
            total_questions: total,
            answered: session.answers().len(),
            question,
            has_previous: in_progress && index > 0,
            has_next: in_progress && index + 1 < total,
            remaining_minutes: if in_progress { session.remaining_minutes(now) } else { None },
            result: session.summary().copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FacultySession {
    pub email: String,
    pub csrf_token: String,
}

/// Tokens handed back to the browser after a successful faculty login.
#[derive(Debug, Clone)]
pub struct FacultyLogin {
    pub session_id: String,
    pub csrf_token: String,
}

#[derive(Clone)]
pub struct AppState {
    pub exam: Arc<RwLock<ExamContext>>,
    pub students: Arc<DashMap<Uuid, StudentSession>>,
    pub faculty: Arc<FacultyDirectory>,
    pub faculty_sessions: Arc<RwLock<HashMap<String, FacultySession>>>,
    pub parser: Arc<dyn QuestionParser>,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    pub fn new(faculty: FacultyDirectory, questions_per_exam: usize, rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            exam: Arc::new(RwLock::new(ExamContext::new(questions_per_exam))),
            students: Arc::new(DashMap::new()),
            faculty: Arc::new(faculty),
            faculty_sessions: Arc::new(RwLock::new(HashMap::new())),
            parser: Arc::new(PatternParser),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn faculty_login(&self, email: &str, password: &str) -> Result<FacultyLogin, ExamError> {
        if let Err(err) = self.faculty.verify(email, password) {
            warn!(email, "faculty login rejected");
            return Err(err);
        }
        let session_id = Uuid::new_v4().to_string();
        let session = FacultySession {
            email: email.to_string(),
            csrf_token: Uuid::new_v4().to_string(),
        };
        let login = FacultyLogin {
            session_id: session_id.clone(),
            csrf_token: session.csrf_token.clone(),
        };
        self.faculty_sessions.write().await.insert(session_id, session);
        info!(email, "faculty logged in");
        Ok(login)
    }

    pub async fn faculty_logout(&self, session_id: &str) -> bool {
        self.faculty_sessions.write().await.remove(session_id).is_some()
    }

    pub async fn faculty_session(&self, session_id: &str) -> Option<FacultySession> {
        self.faculty_sessions.read().await.get(session_id).cloned()
    }

    pub async fn upload_questions(&self, paragraphs: &[String]) -> usize {
        self.exam.write().await.load_questions(self.parser.as_ref(), paragraphs)
    }

    pub async fn generate_exam_code(&self, timer: Option<TimerSettings>) -> ExamConfig {
        let mut exam = self.exam.write().await;
        let mut rng = self.rng();
        exam.generate_exam_code(&mut *rng, timer).clone()
    }

    pub async fn ranked_results(&self) -> Vec<RankedRow> {
        self.exam.read().await.ranked_results()
    }

    pub async fn start_exam(
        &self,
        code: &str,
        roll_number: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<StudentView, ExamError> {
        let mut session = StudentSession::new(roll_number, name);
        {
            let exam = self.exam.read().await;
            let mut rng = self.rng();
            if let Err(err) = exam.start_session(&mut session, code, &mut *rng, now) {
                warn!(roll_number, "exam start rejected: {}", err);
                return Err(err);
            }
        }
        info!(
            roll_number,
            session_id = %session.id,
            questions = session.assigned_questions().len(),
            "exam started"
        );
        let view = StudentView::build(&session, now);
        self.students.insert(session.id, session);
        Ok(view)
    }

    /// Runs the deadline check, then the action. Any attempt that finishes
    /// here is appended to the result history exactly once. Once the timer
    /// has run out, polls and submits get the finished view and every other
    /// action is refused.
    pub async fn student_action(
        &self,
        session_id: Uuid,
        action: StudentAction,
        now: DateTime<Utc>,
    ) -> Result<StudentView, ExamError> {
        let (outcome, finished) = {
            let mut entry = self
                .students
                .get_mut(&session_id)
                .ok_or(ExamError::SessionNotFound)?;
            let session = entry.value_mut();
            let mut finished = session.tick(now);
            if finished.is_some() {
                info!(%session_id, "exam time expired, submitting automatically");
            }
            let outcome = if finished.is_some() {
                match action {
                    StudentAction::Poll | StudentAction::Submit => Ok(StudentView::build(session, now)),
                    _ => Err(ExamError::NotInProgress),
                }
            } else {
                apply_action(session, action, now).map(|record| {
                    if record.is_some() {
                        finished = record;
                    }
                    StudentView::build(session, now)
                })
            };
            (outcome, finished)
        };

        if let Some(record) = finished {
            info!(
                roll_number = %record.roll_number,
                score = record.score,
                "exam submitted"
            );
            self.exam.write().await.record_result(record);
        }
        outcome
    }
}
