//! OpenAI-compatible provider for Ollama, a LiteLLM proxy, Together, Groq, etc.
//!
//! Reuses the OpenAI wire format with a configurable base URL.

use anyhow::Result;
use async_trait::async_trait;

use super::openai::OpenAiProvider;
use super::types::{ChatMessage, ChatResponse, LlmProvider};

/// OpenAI-compatible provider - wraps [`OpenAiProvider`] with a custom name
pub struct OpenAiCompatProvider {
    inner: OpenAiProvider,
    name: String,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    ///
    /// - `name`: human-readable label (e.g. "ollama", "litellm", "groq")
    /// - `base_url`: the endpoint root (e.g. `http://localhost:11434`)
    pub fn new(
        name: String,
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Result<Self> {
        Ok(Self {
            inner: OpenAiProvider::new(api_key, model, base_url, max_tokens)?,
            name,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, messages: &[ChatMessage], system: &str) -> Result<ChatResponse> {
        self.inner.generate(messages, system).await
    }
}
