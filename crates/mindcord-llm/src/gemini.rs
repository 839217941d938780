//! Google Gemini generation provider.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindcord_core::error::{MindcordError, MindcordResult};
use mindcord_core::GenerationService;

use crate::config::{LlmConfig, LlmProvider};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini generation provider.
pub struct GeminiLlm {
    client: Client,
    config: LlmConfig,
    api_key: SecretString,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

impl GeminiLlm {
    /// Create a new Gemini provider.
    pub fn new(config: LlmConfig) -> MindcordResult<Self> {
        let api_key = config.resolve_api_key(LlmProvider::Gemini).ok_or_else(|| {
            MindcordError::Configuration(
                "Gemini API key not found. Set GEMINI_API_KEY or provide api_key in config."
                    .to_string(),
            )
        })?;

        let client = Client::builder().build().map_err(|e| {
            MindcordError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GEMINI_API_URL.to_string());
        let model = config.model_for(LlmProvider::Gemini);

        Ok(Self {
            client,
            config,
            api_key,
            model,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerationService for GeminiLlm {
    async fn complete(&self, prompt: &str) -> MindcordResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| MindcordError::generation(format!("Gemini API request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            MindcordError::generation(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MindcordError::generation(format!(
                "Gemini API error ({}): {}",
                status, message
            )));
        }

        let response: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| MindcordError::generation(format!("Failed to parse response: {}", e)))?;

        debug!(model = %self.model, "Gemini completion received");
        response
            .text()
            .ok_or_else(|| MindcordError::generation("Gemini returned no candidates"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 64,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_first_candidate_text() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "CHANGE: hyped"}, {"text": "\nfeeling it"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().as_deref(), Some("CHANGE: hyped\nfeeling it"));
    }

    #[test]
    fn test_blocked_prompt_has_no_text() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_endpoint_uses_model() {
        let llm = GeminiLlm::new(
            LlmConfig::default()
                .with_api_key("g-test")
                .with_base_url("http://localhost:8080/v1beta/"),
        )
        .unwrap();
        assert_eq!(
            llm.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
