//! switchboard-core - multi-agent request routing
//!
//! This crate provides:
//! - A validated agent tree with a coordinator at its root
//! - Coordinator routing via `transfer_to_agent:` directives or name matches
//! - Append-only session transcripts behind a pluggable session store
//! - A runner that drives one request/response round per call
//! - Generation providers for OpenAI, Google Gemini and OpenAI-compatible APIs

pub mod agents;
pub mod context;
pub mod error;
pub mod providers;
pub mod response;
pub mod routing;
pub mod runner;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_support;

pub use agents::{Agent, AgentDefinition, AgentRegistry};
pub use error::{Result, SwitchboardError};
pub use providers::{
    ChatMessage, ChatResponse, ChatRole, GoogleProvider, LlmProvider, OpenAiCompatProvider,
    OpenAiProvider,
};
pub use response::extract_reply;
pub use routing::{RouteDecision, RouteSource};
pub use runner::{Runner, RunnerConfig};
pub use session::{InMemorySessionStore, Session, SessionHandle, SessionStore};
pub use types::{Message, Turn, TurnRole, USER_AUTHOR};
