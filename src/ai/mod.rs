// src/ai/mod.rs

//! Generative text service: structured prompts in, JSON payloads out.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::models::ai::{ContentAnalysis, DraftQuestionRequest, QuestionDraft};

pub use gemini::GeminiClient;

pub type SharedGenerator = Arc<dyn GenerativeText>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiError {
    #[error("generative text service is not configured")]
    NotConfigured,

    #[error("generative text service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response from generative text service: {0}")]
    InvalidResponse(String),
}

/// A prompt whose answer must be a JSON object matching `response_schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub response_schema: Value,
}

#[async_trait]
pub trait GenerativeText: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, AiError>;
}

const QUESTION_SYSTEM_PROMPT: &str = "You are a world-class educational content generator. \
Your task is to create a single, high-quality exam question based on the user's prompt. \
You MUST respond with a valid JSON object matching the provided schema. \
The marking scheme should detail the necessary elements for full marks. \
Do NOT include any introductory or concluding text outside the JSON object.";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert academic assistant. \
Analyze the provided text and structure your response as a JSON object containing a 'summary' \
of the text (max 4 concise sentences), a list of 5 'keywords' or technical terms, and 3 \
'learningObjectives' suitable for an exam or lesson. \
Do NOT include any text outside the JSON object.";

pub fn question_request(req: &DraftQuestionRequest) -> GenerationRequest {
    let difficulty = serde_json::to_value(req.difficulty)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let style = if req.style.trim().is_empty() {
        "a standard university exam"
    } else {
        req.style.as_str()
    };

    GenerationRequest {
        system_prompt: QUESTION_SYSTEM_PROMPT.to_string(),
        user_prompt: format!(
            "Generate a single exam question on the following topic: \"{}\". \
             The question should be of {} difficulty and written in the style of: \"{}\".",
            req.topic, difficulty, style
        ),
        response_schema: json!({
            "type": "OBJECT",
            "properties": {
                "topic": { "type": "STRING", "description": "The specific academic topic covered." },
                "questionText": { "type": "STRING", "description": "The complete text of the exam question." },
                "points": { "type": "INTEGER", "description": "The total marks/points the question is worth (e.g., 5, 10, 15)." },
                "markingScheme": {
                    "type": "ARRAY",
                    "description": "A list of bullet points detailing the required answer elements or steps for grading.",
                    "items": { "type": "STRING" }
                }
            },
            "propertyOrdering": ["topic", "questionText", "points", "markingScheme"]
        }),
    }
}

pub fn analysis_request(content: &str) -> GenerationRequest {
    GenerationRequest {
        system_prompt: ANALYSIS_SYSTEM_PROMPT.to_string(),
        user_prompt: content.to_string(),
        response_schema: json!({
            "type": "OBJECT",
            "properties": {
                "summary": { "type": "STRING", "description": "A concise summary of the content (max 4 sentences)." },
                "keywords": { "type": "ARRAY", "description": "5 key terms or concepts from the text.", "items": { "type": "STRING" } },
                "learningObjectives": {
                    "type": "ARRAY",
                    "description": "3 potential learning objectives derived from the text (starting with 'Students will be able to...').",
                    "items": { "type": "STRING" }
                }
            },
            "propertyOrdering": ["summary", "keywords", "learningObjectives"]
        }),
    }
}

pub async fn draft_question(
    generator: &dyn GenerativeText,
    req: &DraftQuestionRequest,
) -> Result<QuestionDraft, AiError> {
    let payload = generator.generate(&question_request(req)).await?;
    serde_json::from_value(payload).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

pub async fn analyze_content(
    generator: &dyn GenerativeText,
    content: &str,
) -> Result<ContentAnalysis, AiError> {
    let payload = generator.generate(&analysis_request(content)).await?;
    serde_json::from_value(payload).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;

    struct Canned(Value);

    #[async_trait]
    impl GenerativeText for Canned {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Value, AiError> {
            Ok(self.0.clone())
        }
    }

    fn draft_request() -> DraftQuestionRequest {
        DraftQuestionRequest {
            topic: "Photosynthesis".to_string(),
            difficulty: Difficulty::Hard,
            style: String::new(),
            course: None,
            save: false,
        }
    }

    #[test]
    fn question_prompt_mentions_topic_and_difficulty() {
        let request = question_request(&draft_request());
        assert!(request.user_prompt.contains("\"Photosynthesis\""));
        assert!(request.user_prompt.contains("hard difficulty"));
        assert_eq!(request.response_schema["properties"]["points"]["type"], "INTEGER");
    }

    #[tokio::test]
    async fn draft_is_decoded_from_camel_case_payload() {
        let generator = Canned(json!({
            "topic": "Photosynthesis",
            "questionText": "Explain the light-dependent reactions.",
            "points": 10,
            "markingScheme": ["Mentions thylakoid", "Mentions ATP"]
        }));

        let draft = draft_question(&generator, &draft_request()).await.unwrap();
        assert_eq!(draft.points, 10);
        assert_eq!(draft.marking_scheme.len(), 2);

        let question = draft.into_question("BIO101", Difficulty::Hard, "lect-1");
        assert_eq!(question.kind.label(), "subjective");
        assert_eq!(question.marks, 10);
    }

    #[tokio::test]
    async fn payload_with_wrong_shape_is_invalid() {
        let generator = Canned(json!({"summary": 3}));
        let err = analyze_content(&generator, "text").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }
}
