//! mindcord-llm - Generation service providers for mindcord.
//!
//! Each provider implements [`mindcord_core::GenerationService`]: one prompt
//! in, one completion out.
//!
//! # Supported Providers
//!
//! - **Gemini** - default, via the REST API
//! - **Anthropic** - Claude models, via the REST API
//! - **OpenAI** (feature: `openai`) - GPT models
//! - **Ollama** (feature: `ollama`) - local models
//!
//! # Example
//!
//! ```ignore
//! use mindcord_llm::LlmFactory;
//!
//! // Provider and model from MINDCORD_LLM_* variables
//! let generator = LlmFactory::from_env()?;
//!
//! // Or explicitly
//! let generator = LlmFactory::anthropic_with_model("claude-3-5-sonnet-20240620")?;
//! ```

mod anthropic;
mod config;
mod factory;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use config::{LlmConfig, LlmProvider};
pub use factory::LlmFactory;
pub use gemini::GeminiLlm;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export the core trait for convenience
pub use mindcord_core::GenerationService;
