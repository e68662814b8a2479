//! Runner - drives one request/response round against a session
//!
//! A round starts at the coordinator and follows delegations down the tree
//! until an agent answers. The user turn is committed before any generation
//! starts; the turns produced along the way are buffered and committed
//! together only when the whole chain succeeds.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::agents::{Agent, AgentRegistry};
use crate::context::{build_messages, build_system_prompt};
use crate::error::{Result, SwitchboardError};
use crate::response::extract_reply;
use crate::routing::{self, RouteDecision};
use crate::session::SessionStore;
use crate::types::{Message, Turn};

/// Tunables for a [`Runner`]
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on a single generation call
    pub generation_timeout: Duration,
    /// Only accept `transfer_to_agent:` directives, never bare name mentions
    pub strict_routing: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(60),
            strict_routing: false,
        }
    }
}

pub struct Runner {
    app_name: String,
    agents: Arc<AgentRegistry>,
    sessions: Arc<dyn SessionStore>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agents: Arc<AgentRegistry>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            agents,
            sessions,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one round for `message` and return the turns appended by this call.
    ///
    /// The session must already exist. The session lock is held for the
    /// whole round, so concurrent calls on one session run one after another.
    pub async fn run(&self, user_id: &str, session_id: &str, message: Message) -> Result<Vec<Turn>> {
        let handle = self
            .sessions
            .get(&self.app_name, user_id, session_id)
            .await
            .ok_or_else(|| SwitchboardError::SessionNotFound {
                app_name: self.app_name.clone(),
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
            })?;

        let mut session = handle.lock().await;
        let invocation_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Running invocation {} on session '{}' ({} prior turns)",
            invocation_id,
            session_id,
            session.transcript().len()
        );

        let user_turn = Turn::user(&invocation_id, message);
        session.append(user_turn.clone());

        let produced = match self.drive(session.transcript(), &invocation_id).await {
            Ok(produced) => produced,
            Err(e) => {
                warn!("Invocation {} aborted: {}", invocation_id, e);
                return Err(e);
            }
        };

        let mut turns = Vec::with_capacity(produced.len() + 1);
        turns.push(user_turn);
        for turn in produced {
            session.append(turn.clone());
            turns.push(turn);
        }

        info!(
            "Invocation {} finished with {} turns",
            invocation_id,
            turns.len()
        );
        Ok(turns)
    }

    /// Run one round for plain text and return the reply text
    pub async fn ask(&self, user_id: &str, session_id: &str, text: &str) -> Result<String> {
        let turns = self.run(user_id, session_id, Message::user_text(text)).await?;
        Ok(extract_reply(&turns))
    }

    /// Walk from the coordinator down to the agent that answers, returning
    /// the produced turns in order. Nothing is committed here.
    async fn drive(&self, transcript: &[Turn], invocation_id: &str) -> Result<Vec<Turn>> {
        let mut produced = Vec::new();
        let mut agent = self.agents.root();

        loop {
            let reply = self.generate(agent, transcript).await?;

            if agent.is_leaf() {
                produced.push(Turn::agent(invocation_id, agent.name(), reply));
                return Ok(produced);
            }

            match routing::interpret(agent, &reply, self.config.strict_routing)? {
                RouteDecision::Delegate { target } => {
                    let next = agent.child(&target).ok_or_else(|| {
                        SwitchboardError::no_route(
                            agent.name(),
                            format!("'{}' is not a sub-agent", target),
                        )
                    })?;
                    info!("'{}' delegated to '{}'", agent.name(), next.name());
                    produced.push(Turn::delegation(invocation_id, agent.name(), reply, next.name()));
                    agent = next;
                }
                RouteDecision::Answer(text) => {
                    produced.push(Turn::agent(invocation_id, agent.name(), text));
                    return Ok(produced);
                }
            }
        }
    }

    async fn generate(&self, agent: &Agent, transcript: &[Turn]) -> Result<String> {
        let system = build_system_prompt(agent);
        let messages = build_messages(transcript, agent.name());
        debug!(
            "Invoking '{}' via {} ({}) with {} messages",
            agent.name(),
            agent.provider().provider_name(),
            agent.provider().model(),
            messages.len()
        );

        let limit = self.config.generation_timeout;
        let response = match tokio::time::timeout(limit, agent.provider().generate(&messages, &system)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(SwitchboardError::Generation {
                    agent: agent.name().to_string(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(SwitchboardError::Generation {
                    agent: agent.name().to_string(),
                    source: anyhow!("timed out after {:?}", limit),
                });
            }
        };

        if !response.stop_reason.is_end_turn() {
            debug!("'{}' stopped with {:?}", agent.name(), response.stop_reason);
        }
        Ok(response.text)
    }
}
