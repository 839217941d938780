//! Provider selection and connection settings.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported generation providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    #[default]
    Gemini,
    Anthropic,
    #[strum(serialize = "openai")]
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
}

impl LlmProvider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-1.5-flash",
            LlmProvider::Anthropic => "claude-3-5-haiku-20241022",
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Ollama => "llama3.1:8b",
        }
    }

    /// Environment variable holding the API key, for providers that need one.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("GEMINI_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

/// Connection and sampling settings for one provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name; empty means the provider default.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// API key; falls back to the provider's environment variable.
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.9,
            max_tokens: 512,
            api_key: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Model to use for `provider`, falling back to its default.
    pub fn model_for(&self, provider: LlmProvider) -> String {
        if self.model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    /// The configured key, or the provider's environment variable.
    pub(crate) fn resolve_api_key(&self, provider: LlmProvider) -> Option<SecretString> {
        self.api_key.clone().or_else(|| {
            provider
                .api_key_var()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::new)
        })
    }
}
