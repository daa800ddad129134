// src/models/ai.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{Difficulty, Question, QuestionKind};
use crate::utils::html::clean_html;

/// DTO for drafting a question with the generative service.
#[derive(Debug, Deserialize, Validate)]
pub struct DraftQuestionRequest {
    #[validate(length(min = 1, max = 200, message = "Please enter a topic."))]
    pub topic: String,
    pub difficulty: Difficulty,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub style: String,
    /// Course tag used when the draft is saved.
    #[validate(length(max = 100))]
    #[serde(default)]
    pub course: Option<String>,
    /// Store the draft as a subjective question.
    #[serde(default)]
    pub save: bool,
}

/// Structured question draft returned by the generative service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub topic: String,
    pub question_text: String,
    pub points: u32,
    #[serde(default)]
    pub marking_scheme: Vec<String>,
}

impl QuestionDraft {
    /// Drafts become subjective questions; the marking scheme stays with the
    /// draft response and is not stored on the question. Model output is
    /// sanitised like authored text.
    pub fn into_question(self, course: &str, difficulty: Difficulty, created_by: &str) -> Question {
        Question {
            id: String::new(),
            question_text: clean_html(&self.question_text),
            course: course.to_string(),
            topic: clean_html(&self.topic),
            difficulty,
            marks: self.points.max(1),
            kind: QuestionKind::Subjective,
            media_url: None,
            created_by: created_by.to_string(),
        }
    }
}

/// DTO for content analysis.
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeContentRequest {
    #[validate(length(min = 1, max = 20000, message = "Please paste content to analyze."))]
    pub content: String,
}

/// Summary, keywords and learning objectives extracted from study material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_drafts_are_sanitised() {
        let draft = QuestionDraft {
            topic: "Cells<img src=x onerror=alert(1)>".to_string(),
            question_text: "Q<script>alert(1)</script> <b>why</b>?".to_string(),
            points: 0,
            marking_scheme: vec![],
        };

        let question = draft.into_question("BIO101", Difficulty::Easy, "lect-1");
        assert_eq!(question.question_text, "Q <b>why</b>?");
        assert!(!question.topic.contains("onerror"));
        assert_eq!(question.marks, 1);
        assert!(question.check_invariants().is_ok());
    }
}
