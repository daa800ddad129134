// src/models/exam.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::MAX_EXAM_DURATION_MINUTES;
use crate::models::question::{PublicQuestion, Question, QuestionKind};

/// A document of the `exams` collection.
/// Questions are referenced by id; their content is never copied here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub course: String,
    pub questions: Vec<String>,
    /// Sum of the referenced questions' marks when the exam was generated.
    pub total_marks: u32,
    /// Minutes.
    pub duration: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    /// Duration converted once into whole seconds for the countdown.
    pub fn duration_secs(&self) -> u32 {
        self.duration.saturating_mul(60)
    }
}

/// Sums the per-question marks.
pub fn total_marks(questions: &[Question]) -> u32 {
    questions.iter().map(|q| q.marks).sum()
}

/// DTO for generating an exam from existing questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub course: String,
    #[validate(
        length(min = 1, message = "Please select at least one question."),
        custom(function = validate_distinct_questions)
    )]
    pub questions: Vec<String>,
    #[validate(custom(function = validate_duration))]
    pub duration: u32,
}

fn validate_duration(duration: u32) -> Result<(), validator::ValidationError> {
    if duration == 0 || duration > MAX_EXAM_DURATION_MINUTES {
        return Err(validator::ValidationError::new("duration_out_of_range"));
    }
    Ok(())
}

fn validate_distinct_questions(questions: &Vec<String>) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::with_capacity(questions.len());
    if !questions.iter().all(|id| seen.insert(id.as_str())) {
        let mut err = validator::ValidationError::new("duplicate_question");
        err.message = Some("Each question can only appear once in an exam.".into());
        return Err(err);
    }
    Ok(())
}

/// Exam as shown to a student before starting it.
#[derive(Debug, Serialize)]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub course: String,
    pub question_count: usize,
    pub total_marks: u32,
    pub duration: u32,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            course: exam.course.clone(),
            question_count: exam.questions.len(),
            total_marks: exam.total_marks,
            duration: exam.duration,
        }
    }
}

/// Exam with its questions resolved, answer keys hidden.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub questions: Vec<PublicQuestion>,
}

pub const SUBJECTIVE_GUIDE_ANSWER: &str = "Subjective evaluation required";

/// A document of the `marking_guides` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingGuide {
    #[serde(default)]
    pub id: String,
    pub exam_id: String,
    pub guide_content: GuideContent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideContent {
    pub exam_title: String,
    pub course: String,
    pub total_marks: u32,
    pub questions: Vec<GuideEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideEntry {
    pub text: String,
    pub marks: u32,
    #[serde(rename = "type")]
    pub question_type: String,
    pub correct_answer: String,
}

impl MarkingGuide {
    /// Builds the guide for `exam` from its resolved questions, in exam order.
    pub fn build(exam: &Exam, questions: &[Question]) -> Self {
        let entries = questions
            .iter()
            .map(|q| GuideEntry {
                text: q.question_text.clone(),
                marks: q.marks,
                question_type: q.kind.label().to_string(),
                correct_answer: match &q.kind {
                    QuestionKind::Objective {
                        options,
                        correct_answer,
                    } => options
                        .get(*correct_answer)
                        .cloned()
                        .unwrap_or_else(|| correct_answer.to_string()),
                    QuestionKind::Subjective => SUBJECTIVE_GUIDE_ANSWER.to_string(),
                },
            })
            .collect();

        Self {
            id: String::new(),
            exam_id: exam.id.clone(),
            guide_content: GuideContent {
                exam_title: exam.title.clone(),
                course: exam.course.clone(),
                total_marks: exam.total_marks,
                questions: entries,
            },
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;

    fn question(id: &str, marks: u32, kind: QuestionKind) -> Question {
        Question {
            id: id.to_string(),
            question_text: format!("Question {}", id),
            course: "BIO200".to_string(),
            topic: "Cells".to_string(),
            difficulty: Difficulty::Easy,
            marks,
            kind,
            media_url: None,
            created_by: "lect".to_string(),
        }
    }

    #[test]
    fn total_marks_sums_per_question_marks() {
        let questions = vec![
            question("a", 3, QuestionKind::Subjective),
            question("b", 7, QuestionKind::Subjective),
            question("c", 15, QuestionKind::Subjective),
        ];
        assert_eq!(total_marks(&questions), 25);
        assert_eq!(total_marks(&[]), 0);
    }

    fn exam_request(questions: &[&str], duration: u32) -> CreateExamRequest {
        CreateExamRequest {
            title: "Midterm".to_string(),
            course: "BIO200".to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
            duration,
        }
    }

    #[test]
    fn exam_request_duration_must_be_within_limits() {
        assert!(exam_request(&["a"], 30).validate().is_ok());
        assert!(exam_request(&["a"], MAX_EXAM_DURATION_MINUTES).validate().is_ok());

        for duration in [0, MAX_EXAM_DURATION_MINUTES + 1] {
            let errors = exam_request(&["a"], duration).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("duration"), "{}", duration);
        }
    }

    #[test]
    fn exam_request_rejects_repeated_questions() {
        assert!(exam_request(&["a", "b"], 30).validate().is_ok());

        let errors = exam_request(&["a", "b", "a"], 30).validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields["questions"][0].code, "duplicate_question");
    }

    #[test]
    fn duration_is_converted_to_seconds() {
        let exam = Exam {
            id: "e".to_string(),
            title: "Midterm".to_string(),
            course: "BIO200".to_string(),
            questions: vec![],
            total_marks: 0,
            duration: 45,
            created_by: "lect".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(exam.duration_secs(), 2700);
    }

    #[test]
    fn marking_guide_lists_answers_in_exam_order() {
        let questions = vec![
            question(
                "a",
                2,
                QuestionKind::Objective {
                    options: vec!["x".into(), "y".into(), "z".into(), "w".into()],
                    correct_answer: 2,
                },
            ),
            question("b", 8, QuestionKind::Subjective),
        ];
        let exam = Exam {
            id: "exam-1".to_string(),
            title: "Quiz".to_string(),
            course: "BIO200".to_string(),
            questions: vec!["a".into(), "b".into()],
            total_marks: total_marks(&questions),
            duration: 10,
            created_by: "lect".to_string(),
            created_at: Utc::now(),
        };

        let guide = MarkingGuide::build(&exam, &questions);
        assert_eq!(guide.exam_id, "exam-1");
        assert_eq!(guide.guide_content.total_marks, 10);
        assert_eq!(guide.guide_content.questions[0].correct_answer, "z");
        assert_eq!(guide.guide_content.questions[0].question_type, "objective");
        assert_eq!(
            guide.guide_content.questions[1].correct_answer,
            SUBJECTIVE_GUIDE_ANSWER
        );
    }
}
