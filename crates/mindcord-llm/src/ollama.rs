//! Ollama generation provider for locally hosted models.

use async_trait::async_trait;

use mindcord_core::error::{MindcordError, MindcordResult};
use mindcord_core::GenerationService;

use crate::config::{LlmConfig, LlmProvider};

#[cfg(feature = "ollama")]
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama generation provider.
pub struct OllamaLlm {
    #[cfg(feature = "ollama")]
    client: Ollama,
    model: String,
    host: String,
    port: u16,
}

impl OllamaLlm {
    /// Create a new Ollama provider. No API key is needed.
    pub fn new(config: LlmConfig) -> MindcordResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| MindcordError::Configuration(format!("Invalid Ollama URL: {}", e)))?;
        let host = format!("{}://{}", url.scheme(), url.host_str().unwrap_or("localhost"));
        let port = url.port().unwrap_or(11434);

        #[cfg(feature = "ollama")]
        let client = Ollama::new(host.clone(), port);

        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            model: config.model_for(LlmProvider::Ollama),
            host,
            port,
        })
    }

    /// Address the client talks to.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl GenerationService for OllamaLlm {
    #[cfg(feature = "ollama")]
    async fn complete(&self, prompt: &str) -> MindcordResult<String> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| MindcordError::generation(format!("Ollama API error: {}", e)))?;
        Ok(response.response)
    }

    #[cfg(not(feature = "ollama"))]
    async fn complete(&self, _prompt: &str) -> MindcordResult<String> {
        Err(MindcordError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
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
    fn test_endpoint_from_base_url() {
        let llm = OllamaLlm::new(LlmConfig::default()).unwrap();
        assert_eq!(llm.endpoint(), "http://localhost:11434");
        assert_eq!(llm.model_name(), "llama3.1:8b");

        let llm =
            OllamaLlm::new(LlmConfig::default().with_base_url("http://gpu-box:9000")).unwrap();
        assert_eq!(llm.endpoint(), "http://gpu-box:9000");
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let err = OllamaLlm::new(LlmConfig::default().with_base_url("not a url")).err().unwrap();
        assert!(matches!(err, MindcordError::Configuration(_)));
    }
}
