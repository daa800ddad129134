// src/models/result.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{Question, QuestionKind};

/// A student's answer to one question: the selected option index for
/// objective questions, free text for subjective ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Text(String),
}

pub type AnswerSheet = BTreeMap<String, Answer>;

/// A document of the `results` collection, one per submitted exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    #[serde(default)]
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub answers: AnswerSheet,
    pub submitted_at: DateTime<Utc>,
    pub graded: bool,
    /// Absent until a lecturer grades the attempt.
    #[serde(default)]
    pub score: Option<u32>,
}

impl ExamResult {
    /// Fresh, ungraded submission.
    pub fn submission(exam_id: &str, student_id: &str, answers: AnswerSheet) -> Self {
        Self {
            id: String::new(),
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            answers,
            submitted_at: Utc::now(),
            graded: false,
            score: None,
        }
    }
}

/// Marks earned on objective questions only.
/// Returns (correct_count, earned_marks).
pub fn objective_score(answers: &AnswerSheet, questions: &[Question]) -> (usize, u32) {
    let key: HashMap<&str, (usize, u32)> = questions
        .iter()
        .filter_map(|q| match &q.kind {
            QuestionKind::Objective { correct_answer, .. } => {
                Some((q.id.as_str(), (*correct_answer, q.marks)))
            }
            QuestionKind::Subjective => None,
        })
        .collect();

    let mut correct_count = 0;
    let mut earned = 0;

    for (q_id, answer) in answers {
        if let (Some((correct, marks)), Answer::Choice(chosen)) = (key.get(q_id.as_str()), answer)
        {
            if chosen == correct {
                correct_count += 1;
                earned += marks;
            }
        }
    }

    (correct_count, earned)
}

/// DTO for grading a result.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeRequest {
    #[validate(range(max = 100000))]
    pub score: u32,
}

/// Query parameters for listing results.
#[derive(Debug, Default, Deserialize)]
pub struct ResultListParams {
    pub exam_id: Option<String>,
}

/// Result with the objective auto-score suggestion, as shown to graders.
#[derive(Debug, Serialize)]
pub struct ResultDetail {
    #[serde(flatten)]
    pub result: ExamResult,
    pub total_marks: u32,
    pub objective_correct: usize,
    pub objective_score: u32,
}
