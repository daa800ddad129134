// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        question::PublicQuestion,
        result::{Answer, AnswerSheet},
    },
    session::{ExamSession, SessionState},
};

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1))]
    pub exam_id: String,
}

/// DTO for answering one question.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub answer: Answer,
}

/// Formats whole seconds as `mm:ss`; minutes are not capped at 59.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// What a student sees of their running attempt. No answer keys.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub exam_id: Option<String>,
    pub title: Option<String>,
    pub state: SessionState,
    pub remaining_secs: u32,
    pub remaining: String,
    pub questions: Vec<PublicQuestion>,
    pub answers: AnswerSheet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

impl From<&ExamSession> for SessionView {
    fn from(session: &ExamSession) -> Self {
        Self {
            id: session.id(),
            exam_id: session.exam().map(|e| e.id.clone()),
            title: session.exam().map(|e| e.title.clone()),
            state: session.state(),
            remaining_secs: session.remaining_secs(),
            remaining: format_clock(session.remaining_secs()),
            questions: session.questions().iter().map(PublicQuestion::from).collect(),
            answers: session.answers().clone(),
            result_id: session.result_id().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(125 * 60 + 7), "125:07");
    }

    #[test]
    fn answer_request_accepts_index_or_text() {
        let choice: AnswerRequest =
            serde_json::from_str(r#"{"question_id":"q1","answer":2}"#).unwrap();
        assert_eq!(choice.answer, Answer::Choice(2));

        let text: AnswerRequest =
            serde_json::from_str(r#"{"question_id":"q2","answer":"Because."}"#).unwrap();
        assert_eq!(text.answer, Answer::Text("Because.".to_string()));
    }

    #[test]
    fn fresh_session_view_has_no_exam() {
        let session = ExamSession::new("student-1");
        let view = SessionView::from(&session);
        assert_eq!(view.state, SessionState::Loading);
        assert!(view.exam_id.is_none());
        assert_eq!(view.remaining, "00:00");
    }
}
