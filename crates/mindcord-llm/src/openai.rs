//! OpenAI generation provider.

use async_trait::async_trait;

use mindcord_core::error::{MindcordError, MindcordResult};
use mindcord_core::GenerationService;

use crate::config::{LlmConfig, LlmProvider};

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
#[cfg(feature = "openai")]
use secrecy::ExposeSecret;

/// OpenAI generation provider.
pub struct OpenAIProvider {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: LlmConfig,
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new(config: LlmConfig) -> MindcordResult<Self> {
        let api_key = config.resolve_api_key(LlmProvider::OpenAI).ok_or_else(|| {
            MindcordError::Configuration(
                "OpenAI API key not found. Set OPENAI_API_KEY or provide api_key in config."
                    .to_string(),
            )
        })?;

        #[cfg(feature = "openai")]
        let client = {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
            if let Some(ref base_url) = config.base_url {
                openai_config = openai_config.with_api_base(base_url);
            }
            Client::with_config(openai_config)
        };
        #[cfg(not(feature = "openai"))]
        drop(api_key);

        let model = config.model_for(LlmProvider::OpenAI);
        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
            model,
        })
    }

    /// Reasoning models reject sampling parameters.
    fn is_reasoning_model(&self) -> bool {
        let model = self.model.to_lowercase();
        ["o1", "o3", "gpt-5"].iter().any(|m| model.starts_with(m))
    }
}

#[async_trait]
impl GenerationService for OpenAIProvider {
    #[cfg(feature = "openai")]
    async fn complete(&self, prompt: &str) -> MindcordResult<String> {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let mut request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![message],
            ..Default::default()
        };
        if !self.is_reasoning_model() {
            request.temperature = Some(self.config.temperature);
            request.max_tokens = Some(self.config.max_tokens);
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MindcordError::generation(format!("OpenAI API error: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MindcordError::generation("No response choices returned"))
    }

    #[cfg(not(feature = "openai"))]
    async fn complete(&self, _prompt: &str) -> MindcordResult<String> {
        Err(MindcordError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_models_detected() {
        let config = LlmConfig::default().with_api_key("sk-test");
        let chat = OpenAIProvider::new(config.clone()).unwrap();
        assert_eq!(chat.model_name(), "gpt-4o-mini");
        assert!(!chat.is_reasoning_model());

        let reasoning = OpenAIProvider::new(config.with_model("o3-mini")).unwrap();
        assert!(reasoning.is_reasoning_model());
    }
}
