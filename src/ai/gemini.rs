// src/ai/gemini.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{AiError, GenerationRequest, GenerativeText};
use crate::config::Config;

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Builds a client when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AiError> {
        match &config.gemini_api_key {
            Some(key) => Self::new(key, &config.gemini_base_url, &config.gemini_model).map(Some),
            None => Ok(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn payload(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": request.user_prompt }] }],
        "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

/// Pulls the JSON text out of `candidates[0].content.parts[0].text`.
fn extract_json(body: &Value) -> Result<Value, AiError> {
    let text = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| AiError::InvalidResponse("missing candidate text".to_string()))?;

    serde_json::from_str(text).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl GenerativeText for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, AiError> {
        tracing::info!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload(request))
            .send()
            .await
            .map_err(|e| AiError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Unavailable(format!("API call failed: {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        extract_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_text_is_parsed_as_json() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"summary\":\"s\",\"keywords\":[]}" }] }
            }]
        });
        let value = extract_json(&body).unwrap();
        assert_eq!(value["summary"], "s");
    }

    #[test]
    fn missing_candidates_are_rejected() {
        assert!(matches!(
            extract_json(&json!({"candidates": []})),
            Err(AiError::InvalidResponse(_))
        ));
        let not_json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Sure! Here it is:" }] } }]
        });
        assert!(matches!(extract_json(&not_json), Err(AiError::InvalidResponse(_))));
    }

    #[test]
    fn payload_carries_schema_and_prompts() {
        let request = GenerationRequest {
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            response_schema: json!({"type": "OBJECT"}),
        };
        let body = payload(&request);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "user");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new("k", "http://localhost:9/v1beta/", "gemini-test").unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-test:generateContent"
        );
    }
}
