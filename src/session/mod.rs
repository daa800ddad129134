// src/session/mod.rs

//! Exam-taking session lifecycle.
//!
//! ```text
//! Loading ──start──▶ InProgress ──submit / tick to 0──▶ Submitting ──store ok──▶ Submitted
//!    │                   │
//!    └─start fails─▶ Failed   └─abandon─▶ Abandoned
//! ```
//!
//! Every transition takes `&mut self`. Shared access goes through a
//! [`SessionHandle`], whose mutex keeps the state check and the transition
//! together, so a timeout and a manual submit cannot both capture.

pub mod countdown;
pub mod registry;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{
        exam::Exam,
        question::{Question, QuestionKind},
        result::{Answer, AnswerSheet, ExamResult},
    },
    store::{self, DocumentStore, EXAMS, QUESTIONS, RESULTS, StoreError},
};

pub use countdown::spawn_countdown;
pub use registry::{SessionHandle, SessionRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    InProgress,
    Submitting,
    Submitted,
    Abandoned,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Submitted | SessionState::Abandoned)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("{0} not found")]
    NotFound(String),

    /// The store could not be reached; the same transition may be retried.
    #[error("document store unavailable: {0}")]
    Store(String),

    #[error("{0}")]
    Validation(String),

    #[error("session is {0:?}, no attempt is in progress")]
    NotActive(SessionState),
}

impl SessionError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, SessionError::Store(_))
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                SessionError::NotFound(format!("{}/{}", collection, id))
            }
            StoreError::Unavailable(msg) => SessionError::Store(msg),
            StoreError::Malformed(msg) => SessionError::Store(msg),
            StoreError::Conflict(msg) => SessionError::Validation(msg),
        }
    }
}

/// Whether a call changed the session. Calls against a finished session are
/// `Ignored` rather than errors, so repeated clicks are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The session is not in progress; the countdown should stop.
    Idle,
    Counting(u32),
    /// Time ran out and the answers were captured for submission.
    Expired,
}

#[derive(Debug)]
pub struct ExamSession {
    id: Uuid,
    student_id: String,
    exam: Option<Exam>,
    snapshot: Arc<[Question]>,
    answers: AnswerSheet,
    remaining_secs: u32,
    state: SessionState,
    pending: Option<ExamResult>,
    result_id: Option<String>,
}

impl ExamSession {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            exam: None,
            snapshot: Arc::from(Vec::new()),
            answers: AnswerSheet::new(),
            remaining_secs: 0,
            state: SessionState::Loading,
            pending: None,
            result_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn exam(&self) -> Option<&Exam> {
        self.exam.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.snapshot
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Answers frozen by the first submit attempt, if any.
    pub fn captured(&self) -> Option<&AnswerSheet> {
        self.pending.as_ref().map(|r| &r.answers)
    }

    pub fn result_id(&self) -> Option<&str> {
        self.result_id.as_deref()
    }

    /// Loads the exam and snapshots its questions.
    ///
    /// Allowed from `Loading`, or from `Failed` to retry.
    pub async fn start(
        &mut self,
        store: &dyn DocumentStore,
        exam_id: &str,
    ) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Loading | SessionState::Failed) {
            return Err(SessionError::NotActive(self.state));
        }

        match load_snapshot(store, exam_id).await {
            Ok((exam, questions)) => {
                self.remaining_secs = exam.duration_secs();
                self.snapshot = Arc::from(questions);
                self.exam = Some(exam);
                self.answers.clear();
                self.state = SessionState::InProgress;
                tracing::info!(
                    session = %self.id,
                    exam = exam_id,
                    questions = self.snapshot.len(),
                    "Exam session started"
                );
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::warn!(session = %self.id, exam = exam_id, "Exam session failed to start: {}", e);
                Err(e)
            }
        }
    }

    /// Records (or replaces) the answer to one question.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: Answer,
    ) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::InProgress => {}
            SessionState::Submitting | SessionState::Submitted | SessionState::Abandoned => {
                return Ok(Transition::Ignored);
            }
            state => return Err(SessionError::NotActive(state)),
        }

        let question = self
            .snapshot
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                SessionError::Validation(format!("question {} is not part of this exam", question_id))
            })?;

        match (&question.kind, &answer) {
            (QuestionKind::Objective { options, .. }, Answer::Choice(index)) => {
                if *index >= options.len() {
                    return Err(SessionError::Validation(format!(
                        "option {} is out of range for {} options",
                        index,
                        options.len()
                    )));
                }
            }
            (QuestionKind::Subjective, Answer::Text(_)) => {}
            (QuestionKind::Objective { .. }, Answer::Text(_)) => {
                return Err(SessionError::Validation(
                    "objective questions take an option index".to_string(),
                ));
            }
            (QuestionKind::Subjective, Answer::Choice(_)) => {
                return Err(SessionError::Validation(
                    "subjective questions take a text answer".to_string(),
                ));
            }
        }

        self.answers.insert(question_id.to_string(), answer);
        Ok(Transition::Applied)
    }

    /// One second of the countdown. Ignored unless the session is in progress.
    pub fn tick(&mut self) -> Tick {
        if self.state != SessionState::InProgress {
            return Tick::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Counting(self.remaining_secs);
        }

        tracing::info!(session = %self.id, "Time is up, submitting automatically");
        match self.capture() {
            Ok(()) => Tick::Expired,
            Err(e) => {
                tracing::error!(session = %self.id, "Cannot auto-submit: {}", e);
                self.state = SessionState::Failed;
                Tick::Idle
            }
        }
    }

    /// Ticks and, when time runs out, performs the auto-submit.
    pub async fn advance(&mut self, store: &dyn DocumentStore) -> Result<Tick, SessionError> {
        let tick = self.tick();
        if tick == Tick::Expired {
            self.flush(store).await?;
        }
        Ok(tick)
    }

    /// Submits the attempt.
    ///
    /// The first call freezes the answers; a call after a failed store write
    /// resends that same record. Calls on a finished session are ignored.
    pub async fn submit(&mut self, store: &dyn DocumentStore) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::InProgress => self.capture()?,
            SessionState::Submitting => {}
            SessionState::Submitted | SessionState::Abandoned => return Ok(Transition::Ignored),
            state => return Err(SessionError::NotActive(state)),
        }
        self.flush(store).await?;
        Ok(Transition::Applied)
    }

    /// Drops the attempt without writing a result.
    pub fn abandon(&mut self) -> Transition {
        if self.state != SessionState::InProgress {
            return Transition::Ignored;
        }
        self.state = SessionState::Abandoned;
        tracing::info!(session = %self.id, "Exam session abandoned");
        Transition::Applied
    }

    /// Freezes the answers into the record to be written. Requires a loaded exam.
    fn capture(&mut self) -> Result<(), SessionError> {
        let exam = self
            .exam
            .as_ref()
            .ok_or(SessionError::NotActive(self.state))?;
        self.pending = Some(ExamResult::submission(
            &exam.id,
            &self.student_id,
            self.answers.clone(),
        ));
        self.state = SessionState::Submitting;
        Ok(())
    }

    async fn flush(&mut self, store: &dyn DocumentStore) -> Result<(), SessionError> {
        let Some(record) = self.pending.as_ref() else {
            return Err(SessionError::NotActive(self.state));
        };

        match store::create_from(store, RESULTS, record).await {
            Ok(id) => {
                tracing::info!(session = %self.id, result = %id, "Exam submitted");
                self.result_id = Some(id);
                self.state = SessionState::Submitted;
                Ok(())
            }
            Err(e) => {
                tracing::error!(session = %self.id, "Failed to store exam result: {}", e);
                Err(SessionError::from(e))
            }
        }
    }
}

async fn load_snapshot(
    store: &dyn DocumentStore,
    exam_id: &str,
) -> Result<(Exam, Vec<Question>), SessionError> {
    let exam: Exam = store::get_as(store, EXAMS, exam_id).await?;
    let mut questions = Vec::with_capacity(exam.questions.len());
    for question_id in &exam.questions {
        questions.push(store::get_as::<Question>(store, QUESTIONS, question_id).await?);
    }
    Ok((exam, questions))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use crate::store::{MemoryStore, create_from, list_as};
    use chrono::Utc;

    pub(crate) async fn seed_exam(store: &MemoryStore, duration: u32) -> (String, Vec<String>) {
        let mut ids = Vec::new();
        for (text, kind) in [
            (
                "Capital of France?",
                QuestionKind::Objective {
                    options: vec!["Lyon".into(), "Paris".into(), "Nice".into(), "Lille".into()],
                    correct_answer: 1,
                },
            ),
            (
                "Largest planet?",
                QuestionKind::Objective {
                    options: vec!["Mars".into(), "Venus".into(), "Jupiter".into(), "Earth".into()],
                    correct_answer: 2,
                },
            ),
            ("Describe the water cycle.", QuestionKind::Subjective),
        ] {
            let question = Question {
                id: String::new(),
                question_text: text.to_string(),
                course: "GEN100".to_string(),
                topic: "General".to_string(),
                difficulty: Difficulty::Easy,
                marks: 5,
                kind,
                media_url: None,
                created_by: "lecturer".to_string(),
            };
            ids.push(create_from(store, QUESTIONS, &question).await.unwrap());
        }

        let exam = Exam {
            id: String::new(),
            title: "General knowledge".to_string(),
            course: "GEN100".to_string(),
            questions: ids.clone(),
            total_marks: 15,
            duration,
            created_by: "lecturer".to_string(),
            created_at: Utc::now(),
        };
        let exam_id = create_from(store, EXAMS, &exam).await.unwrap();
        (exam_id, ids)
    }

    async fn started(store: &MemoryStore, duration: u32) -> (ExamSession, Vec<String>) {
        let (exam_id, ids) = seed_exam(store, duration).await;
        let mut session = ExamSession::new("student-1");
        session.start(store, &exam_id).await.unwrap();
        (session, ids)
    }

    async fn results(store: &MemoryStore) -> Vec<ExamResult> {
        list_as(store, RESULTS, None).await.unwrap()
    }

    #[tokio::test]
    async fn start_initializes_countdown_and_snapshot() {
        let store = MemoryStore::new();
        let (session, ids) = started(&store, 2).await;

        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.remaining_secs(), 120);
        assert!(session.answers().is_empty());
        let snapshot: Vec<&str> = session.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(snapshot, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn snapshot_is_insulated_from_later_edits() {
        let store = MemoryStore::new();
        let (session, ids) = started(&store, 2).await;

        let mut edited: Question = store::get_as(&store, QUESTIONS, &ids[0]).await.unwrap();
        edited.question_text = "Capital of Germany?".to_string();
        store::update_from(&store, QUESTIONS, &ids[0], &edited).await.unwrap();

        assert_eq!(session.questions()[0].question_text, "Capital of France?");
    }

    #[tokio::test]
    async fn repeated_answers_keep_the_last_value() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 5).await;

        for choice in [0, 3, 2, 1] {
            session.record_answer(&ids[0], Answer::Choice(choice)).unwrap();
        }
        session.record_answer(&ids[2], Answer::Text("evap".into())).unwrap();
        session.record_answer(&ids[2], Answer::Text("evaporation".into())).unwrap();

        assert_eq!(session.answers()[&ids[0]], Answer::Choice(1));
        assert_eq!(session.answers()[&ids[2]], Answer::Text("evaporation".into()));
        assert_eq!(session.answers().len(), 2);
    }

    #[tokio::test]
    async fn invalid_answers_are_rejected_without_changes() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 5).await;
        session.record_answer(&ids[0], Answer::Choice(2)).unwrap();

        let unknown = session.record_answer("not-in-exam", Answer::Choice(0));
        assert!(matches!(unknown, Err(SessionError::Validation(_))));
        let out_of_range = session.record_answer(&ids[0], Answer::Choice(4));
        assert!(matches!(out_of_range, Err(SessionError::Validation(_))));
        let wrong_shape = session.record_answer(&ids[2], Answer::Choice(0));
        assert!(matches!(wrong_shape, Err(SessionError::Validation(_))));

        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.answers()[&ids[0]], Answer::Choice(2));
    }

    #[tokio::test]
    async fn double_submit_creates_one_result() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 5).await;
        session.record_answer(&ids[1], Answer::Choice(2)).unwrap();

        assert_eq!(session.submit(&store).await.unwrap(), Transition::Applied);
        assert_eq!(session.submit(&store).await.unwrap(), Transition::Ignored);

        let stored = results(&store).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(session.state(), SessionState::Submitted);
        assert_eq!(session.result_id(), Some(stored[0].id.as_str()));
        assert_eq!(stored[0].student_id, "student-1");
        assert!(!stored[0].graded);
        assert_eq!(stored[0].score, None);
    }

    #[tokio::test]
    async fn timeout_auto_submits_once_and_stops_counting() {
        let store = MemoryStore::new();
        let (mut session, _) = started(&store, 1).await;

        for _ in 0..59 {
            assert!(matches!(session.advance(&store).await.unwrap(), Tick::Counting(_)));
        }
        assert_eq!(session.advance(&store).await.unwrap(), Tick::Expired);
        assert_eq!(session.state(), SessionState::Submitted);
        assert_eq!(session.remaining_secs(), 0);

        for _ in 0..5 {
            assert_eq!(session.advance(&store).await.unwrap(), Tick::Idle);
        }
        assert_eq!(session.remaining_secs(), 0);
        assert_eq!(results(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn unanswered_questions_are_absent_after_auto_submit() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 1).await;
        session.record_answer(&ids[0], Answer::Choice(1)).unwrap();

        for _ in 0..60 {
            session.advance(&store).await.unwrap();
        }

        let stored = results(&store).await;
        assert_eq!(stored.len(), 1);
        let mut expected = AnswerSheet::new();
        expected.insert(ids[0].clone(), Answer::Choice(1));
        assert_eq!(stored[0].answers, expected);
    }

    #[tokio::test]
    async fn manual_submit_before_timeout_wins() {
        let store = MemoryStore::new();
        let (mut session, _) = started(&store, 1).await;
        for _ in 0..59 {
            session.tick();
        }

        assert_eq!(session.submit(&store).await.unwrap(), Transition::Applied);
        assert_eq!(session.advance(&store).await.unwrap(), Tick::Idle);
        assert_eq!(results(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn timeout_before_manual_submit_wins() {
        let store = MemoryStore::new();
        let (mut session, _) = started(&store, 1).await;
        for _ in 0..59 {
            session.tick();
        }

        assert_eq!(session.advance(&store).await.unwrap(), Tick::Expired);
        assert_eq!(session.submit(&store).await.unwrap(), Transition::Ignored);
        assert_eq!(results(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn timeout_capture_is_flushed_by_a_manual_submit() {
        let store = MemoryStore::new();
        let (mut session, _) = started(&store, 1).await;
        for _ in 0..59 {
            session.tick();
        }

        // Tick captured, but the flush has not happened yet.
        assert_eq!(session.tick(), Tick::Expired);
        assert_eq!(session.state(), SessionState::Submitting);
        assert_eq!(session.submit(&store).await.unwrap(), Transition::Applied);
        assert_eq!(session.submit(&store).await.unwrap(), Transition::Ignored);
        assert_eq!(results(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_timeout_and_submit_produce_one_result() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let (mut session, _) = started(&store, 1).await;
        for _ in 0..59 {
            session.tick();
        }
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(session));

        let timer = {
            let handle = handle.clone();
            let store = store.clone();
            tokio::spawn(async move { handle.lock().await.advance(&*store).await })
        };
        let manual = {
            let handle = handle.clone();
            let store = store.clone();
            tokio::spawn(async move { handle.lock().await.submit(&*store).await })
        };

        let tick = timer.await.unwrap().unwrap();
        let transition = manual.await.unwrap().unwrap();

        // Exactly one of the two did the work.
        let timer_won = tick == Tick::Expired;
        let manual_won = transition == Transition::Applied;
        assert!(timer_won ^ manual_won);
        assert_eq!(results(&store).await.len(), 1);
        assert_eq!(handle.lock().await.state(), SessionState::Submitted);
    }

    #[tokio::test]
    async fn unknown_exam_fails_without_result_or_countdown() {
        let store = MemoryStore::new();
        let mut session = ExamSession::new("student-1");

        let err = session.start(&store, "missing-exam").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.remaining_secs(), 0);
        assert!(matches!(
            session.submit(&store).await,
            Err(SessionError::NotActive(SessionState::Failed))
        ));
        assert!(results(&store).await.is_empty());
    }

    #[tokio::test]
    async fn start_can_be_retried_after_outage() {
        let store = MemoryStore::new();
        let (exam_id, _) = seed_exam(&store, 3).await;
        let mut session = ExamSession::new("student-1");

        store.fail_next(1);
        let err = session.start(&store, &exam_id).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(session.state(), SessionState::Failed);

        session.start(&store, &exam_id).await.unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.remaining_secs(), 180);
    }

    #[tokio::test]
    async fn retry_after_failed_submit_keeps_first_capture() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 5).await;
        session.record_answer(&ids[0], Answer::Choice(1)).unwrap();

        store.fail_next(1);
        let err = session.submit(&store).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(session.state(), SessionState::Submitting);

        // Edits during the retry window are not part of the submission.
        assert_eq!(
            session.record_answer(&ids[1], Answer::Choice(2)).unwrap(),
            Transition::Ignored
        );

        assert_eq!(session.submit(&store).await.unwrap(), Transition::Applied);
        let stored = results(&store).await;
        assert_eq!(stored.len(), 1);
        let mut expected = AnswerSheet::new();
        expected.insert(ids[0].clone(), Answer::Choice(1));
        assert_eq!(stored[0].answers, expected);
        assert_eq!(session.captured(), Some(&expected));
    }

    #[tokio::test]
    async fn abandon_writes_nothing_and_is_final() {
        let store = MemoryStore::new();
        let (mut session, ids) = started(&store, 5).await;
        session.record_answer(&ids[0], Answer::Choice(0)).unwrap();

        assert_eq!(session.abandon(), Transition::Applied);
        assert_eq!(session.abandon(), Transition::Ignored);
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.submit(&store).await.unwrap(), Transition::Ignored);
        assert_eq!(
            session.record_answer(&ids[0], Answer::Choice(1)).unwrap(),
            Transition::Ignored
        );
        assert_eq!(session.state(), SessionState::Abandoned);
        assert!(results(&store).await.is_empty());
    }

    #[tokio::test]
    async fn answers_before_start_are_rejected() {
        let mut session = ExamSession::new("student-1");
        assert!(matches!(
            session.record_answer("q", Answer::Choice(0)),
            Err(SessionError::NotActive(SessionState::Loading))
        ));
        assert_eq!(session.abandon(), Transition::Ignored);
    }

    #[tokio::test]
    async fn submit_without_a_loaded_exam_writes_nothing() {
        let store = MemoryStore::new();
        let mut session = ExamSession::new("student-1");
        session.state = SessionState::InProgress;

        let err = session.submit(&store).await.unwrap_err();
        assert_eq!(err, SessionError::NotActive(SessionState::InProgress));
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(session.captured().is_none());
        assert!(results(&store).await.is_empty());
    }

    #[tokio::test]
    async fn expiry_without_a_loaded_exam_fails_the_session() {
        let store = MemoryStore::new();
        let mut session = ExamSession::new("student-1");
        session.state = SessionState::InProgress;
        session.remaining_secs = 1;

        assert_eq!(session.advance(&store).await.unwrap(), Tick::Idle);
        assert_eq!(session.state(), SessionState::Failed);
        assert!(results(&store).await.is_empty());
    }
}
