//! Factory for creating generation providers.

use std::sync::Arc;

use tracing::info;

use mindcord_core::error::{MindcordError, MindcordResult};
use mindcord_core::GenerationService;

use crate::anthropic::AnthropicLlm;
use crate::config::{LlmConfig, LlmProvider};
use crate::gemini::GeminiLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating generation providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create a provider from the given configuration.
    pub fn create(
        provider: LlmProvider,
        config: LlmConfig,
    ) -> MindcordResult<Arc<dyn GenerationService>> {
        let service: Arc<dyn GenerationService> = match provider {
            LlmProvider::Gemini => Arc::new(GeminiLlm::new(config)?),
            LlmProvider::Anthropic => Arc::new(AnthropicLlm::new(config)?),
            LlmProvider::OpenAI => Arc::new(OpenAIProvider::new(config)?),
            LlmProvider::Ollama => Arc::new(OllamaLlm::new(config)?),
        };
        info!(%provider, model = service.model_name(), "Generation provider ready");
        Ok(service)
    }

    /// Create a provider from the environment.
    ///
    /// Reads `MINDCORD_LLM_PROVIDER` (default `gemini`), `MINDCORD_LLM_MODEL`,
    /// `MINDCORD_LLM_BASE_URL` and the provider's own API key variable.
    pub fn from_env() -> MindcordResult<Arc<dyn GenerationService>> {
        let provider = match std::env::var("MINDCORD_LLM_PROVIDER") {
            Ok(name) => name
                .parse::<LlmProvider>()
                .map_err(|_| MindcordError::UnsupportedProvider { provider: name })?,
            Err(_) => LlmProvider::default(),
        };

        let mut config = LlmConfig::default();
        if let Ok(model) = std::env::var("MINDCORD_LLM_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("MINDCORD_LLM_BASE_URL") {
            config.base_url = Some(url);
        }
        Self::create(provider, config)
    }

    /// Create a Gemini provider with a specific model.
    pub fn gemini_with_model(
        model: impl Into<String>,
    ) -> MindcordResult<Arc<dyn GenerationService>> {
        Self::create(LlmProvider::Gemini, LlmConfig::default().with_model(model))
    }

    /// Create an Anthropic provider with a specific model.
    pub fn anthropic_with_model(
        model: impl Into<String>,
    ) -> MindcordResult<Arc<dyn GenerationService>> {
        Self::create(LlmProvider::Anthropic, LlmConfig::default().with_model(model))
    }

    /// Create an OpenAI provider with a specific model.
    pub fn openai_with_model(
        model: impl Into<String>,
    ) -> MindcordResult<Arc<dyn GenerationService>> {
        Self::create(LlmProvider::OpenAI, LlmConfig::default().with_model(model))
    }

    /// Create an Ollama provider with default configuration.
    pub fn ollama() -> MindcordResult<Arc<dyn GenerationService>> {
        Self::create(LlmProvider::Ollama, LlmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_each_provider_with_key() {
        for provider in [LlmProvider::Gemini, LlmProvider::Anthropic, LlmProvider::OpenAI] {
            let config = LlmConfig::default().with_api_key("test-key").with_model("m-1");
            let service = LlmFactory::create(provider, config).unwrap();
            assert_eq!(service.model_name(), "m-1");
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let service = LlmFactory::ollama().unwrap();
        assert_eq!(service.model_name(), "llama3.1:8b");
    }
}
