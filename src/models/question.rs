// src/models/question.rs

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::{config::OBJECTIVE_OPTION_COUNT, error::AppError, utils::html::clean_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// Objective questions carry their options and the index of the right one;
/// subjective questions are free text and store no answer.
/// Serialized under the `type` key, the rest of the fields are flattened
/// into the question document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Objective {
        options: Vec<String>,
        correct_answer: usize,
    },
    Subjective,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Objective { .. } => "objective",
            QuestionKind::Subjective => "subjective",
        }
    }
}

/// A document of the `questions` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,

    pub question_text: String,
    pub course: String,
    pub topic: String,
    pub difficulty: Difficulty,

    /// Points awarded for the question. Always positive.
    pub marks: u32,

    #[serde(flatten)]
    pub kind: QuestionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    #[serde(default)]
    pub created_by: String,
}

impl Question {
    /// Number of selectable options; zero for subjective questions.
    pub fn option_count(&self) -> usize {
        match &self.kind {
            QuestionKind::Objective { options, .. } => options.len(),
            QuestionKind::Subjective => 0,
        }
    }

    /// Checks the stored-record invariants: positive marks and, for objective
    /// questions, a correct answer that indexes the option list.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.marks == 0 {
            return Err("marks must be positive".to_string());
        }
        if let QuestionKind::Objective {
            options,
            correct_answer,
        } = &self.kind
        {
            if options.is_empty() {
                return Err("objective questions need options".to_string());
            }
            if *correct_answer >= options.len() {
                return Err(format!(
                    "correct_answer {} is out of range for {} options",
                    correct_answer,
                    options.len()
                ));
            }
        }
        Ok(())
    }
}

/// DTO for sending a question to an exam taker (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question_text: String,
    pub marks: u32,
    #[serde(rename = "type")]
    pub question_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let options = match &q.kind {
            QuestionKind::Objective { options, .. } => Some(options.clone()),
            QuestionKind::Subjective => None,
        };
        Self {
            id: q.id.clone(),
            question_text: q.question_text.clone(),
            marks: q.marks,
            question_type: q.kind.label(),
            options,
            media_url: q.media_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Objective,
    Subjective,
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 500))]
    pub question_text: String,
    #[validate(length(min = 1, max = 100))]
    pub course: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 1000))]
    pub marks: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<usize>,
    #[validate(custom(function = validate_media_url))]
    pub media_url: Option<String>,
}

fn validate_options(options: &Vec<String>) -> Result<(), validator::ValidationError> {
    if options.len() != OBJECTIVE_OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_media_url(url: &String) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_media_url"));
    }
    Ok(())
}

impl QuestionRequest {
    /// Validates the payload and turns it into a sanitized `Question`.
    pub fn into_question(self, created_by: &str) -> Result<Question, AppError> {
        self.validate()?;

        let kind = match self.question_type {
            QuestionType::Objective => {
                let options = self.options.ok_or_else(|| {
                    AppError::BadRequest("objective questions require options".to_string())
                })?;
                let correct_answer = self.correct_answer.ok_or_else(|| {
                    AppError::BadRequest("objective questions require correct_answer".to_string())
                })?;
                QuestionKind::Objective {
                    options: options.iter().map(|o| clean_html(o)).collect(),
                    correct_answer,
                }
            }
            QuestionType::Subjective => QuestionKind::Subjective,
        };

        let question = Question {
            id: String::new(),
            question_text: clean_html(&self.question_text),
            course: self.course,
            topic: self.topic,
            difficulty: self.difficulty,
            marks: self.marks,
            kind,
            media_url: self.media_url,
            created_by: created_by.to_string(),
        };
        question.check_invariants().map_err(AppError::BadRequest)?;
        Ok(question)
    }
}

/// Query parameters for listing questions.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionListParams {
    pub course: Option<String>,
    pub topic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objective_request(correct: usize) -> QuestionRequest {
        QuestionRequest {
            question_text: "2 + 2 = ?".to_string(),
            course: "MATH100".to_string(),
            topic: "Arithmetic".to_string(),
            difficulty: Difficulty::Easy,
            marks: 2,
            question_type: QuestionType::Objective,
            options: Some(vec!["3".into(), "4".into(), "5".into(), "22".into()]),
            correct_answer: Some(correct),
            media_url: None,
        }
    }

    #[test]
    fn objective_question_serializes_flat() {
        let question = objective_request(1).into_question("lect-1").unwrap();
        let value = serde_json::to_value(&question).unwrap();

        assert_eq!(value["type"], "objective");
        assert_eq!(value["correct_answer"], 1);
        assert_eq!(value["options"].as_array().unwrap().len(), 4);
        assert_eq!(value["difficulty"], "easy");
        assert!(value.get("media_url").is_none());
    }

    #[test]
    fn subjective_question_parses_without_options() {
        let question: Question = serde_json::from_value(json!({
            "id": "q-1",
            "question_text": "Explain TCP slow start.",
            "course": "NET101",
            "topic": "TCP",
            "difficulty": "hard",
            "marks": 10,
            "type": "subjective"
        }))
        .unwrap();

        assert_eq!(question.kind, QuestionKind::Subjective);
        assert_eq!(question.option_count(), 0);
        assert!(question.created_by.is_empty());
    }

    #[test]
    fn out_of_range_correct_answer_is_rejected() {
        let err = objective_request(4).into_question("lect-1").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn objective_request_needs_exactly_four_options() {
        let mut req = objective_request(0);
        req.options = Some(vec!["a".into(), "b".into()]);
        assert!(req.into_question("lect-1").is_err());

        let mut req = objective_request(0);
        req.options = None;
        assert!(req.into_question("lect-1").is_err());
    }

    #[test]
    fn question_text_is_sanitized() {
        let mut req = objective_request(0);
        req.question_text = "<b>Pick</b><script>alert(1)</script>".to_string();
        let question = req.into_question("lect-1").unwrap();
        assert_eq!(question.question_text, "<b>Pick</b>");
    }

    #[test]
    fn invalid_media_url_fails_validation() {
        let mut req = objective_request(0);
        req.media_url = Some("not a url".to_string());
        assert!(matches!(
            req.into_question("lect-1"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn public_question_hides_answer_key() {
        let question = objective_request(3).into_question("lect-1").unwrap();
        let public = serde_json::to_value(PublicQuestion::from(&question)).unwrap();
        assert!(public.get("correct_answer").is_none());
        assert_eq!(public["type"], "objective");
    }
}
