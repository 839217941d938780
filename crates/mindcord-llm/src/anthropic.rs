//! Anthropic (Claude) generation provider.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindcord_core::error::{MindcordError, MindcordResult};
use mindcord_core::GenerationService;

use crate::config::{LlmConfig, LlmProvider};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic generation provider.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

impl AnthropicLlm {
    /// Create a new Anthropic provider.
    pub fn new(config: LlmConfig) -> MindcordResult<Self> {
        let api_key = config.resolve_api_key(LlmProvider::Anthropic).ok_or_else(|| {
            MindcordError::Configuration(
                "Anthropic API key not found. Set ANTHROPIC_API_KEY or provide api_key in config."
                    .to_string(),
            )
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key
                .expose_secret()
                .parse()
                .map_err(|_| MindcordError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            reqwest::header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                MindcordError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
        let model = config.model_for(LlmProvider::Anthropic);

        Ok(Self {
            client,
            config,
            model,
            base_url,
        })
    }
}

#[async_trait]
impl GenerationService for AnthropicLlm {
    async fn complete(&self, prompt: &str) -> MindcordResult<String> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| MindcordError::generation(format!("Anthropic API request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            MindcordError::generation(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MindcordError::generation(format!(
                "Anthropic API error ({}): {}",
                status, message
            )));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| MindcordError::generation(format!("Failed to parse response: {}", e)))?;

        debug!(model = %self.model, "Anthropic completion received");
        response
            .text()
            .ok_or_else(|| MindcordError::generation("Anthropic returned no text content"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
