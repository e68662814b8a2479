//! Error types for switchboard-core

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, SwitchboardError>;

/// Failures surfaced to callers of the registry, store and runner.
///
/// Every variant is distinct so a caller can decide what to show the end
/// user. None of them is ever turned into an empty reply.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// The agent tree or its definitions are invalid. Fatal at startup.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// No session exists for the given key; the caller must create it first.
    #[error("Session not found: {app_name}/{user_id}/{session_id}")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    /// A session with the same key was already created.
    #[error("Session already exists: {app_name}/{user_id}/{session_id}")]
    SessionExists {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    /// The coordinator neither delegated nor answered.
    #[error("No route from agent '{agent}': {reason}")]
    NoRoute { agent: String, reason: String },

    /// The generation capability of an agent failed or timed out.
    #[error("Generation failed for agent '{agent}': {source}")]
    Generation {
        agent: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SwitchboardError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_route(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoRoute {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call (possibly rephrased) may succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }
}
