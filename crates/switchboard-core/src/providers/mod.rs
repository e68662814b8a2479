//! Generation capability and its provider implementations
//!
//! Supports OpenAI, Google Gemini, and any OpenAI-compatible endpoint
//! (Ollama, a LiteLLM proxy, Groq, ...). Every provider implements
//! [`LlmProvider`]; agents hold one behind an `Arc`.

pub mod google;
pub mod openai;
pub mod openai_compat;
pub mod types;

pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use types::{ChatMessage, ChatResponse, ChatRole, ChatUsage, LlmProvider, StopReason};
