//! Deterministic providers and fixtures shared by the unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::agents::{Agent, AgentRegistry};
use crate::providers::{ChatMessage, ChatResponse, ChatRole, LlmProvider};

/// Always replies with the same text
pub struct StaticProvider {
    text: String,
}

impl StaticProvider {
    pub fn shared(text: &str) -> Arc<dyn LlmProvider> {
        Arc::new(Self {
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for StaticProvider {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model(&self) -> &str {
        "static-1"
    }

    async fn generate(&self, _messages: &[ChatMessage], _system: &str) -> Result<ChatResponse> {
        Ok(ChatResponse::from_text(self.text.clone()))
    }
}

/// One recorded `generate` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

/// Replies based on keywords in the latest user message, recording calls
pub struct ScriptedProvider {
    rules: Vec<(String, String)>,
    fallback: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(rules: &[(&str, &str)], fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            rules: rules
                .iter()
                .map(|(k, r)| (k.to_lowercase(), r.to_string()))
                .collect(),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, messages: &[ChatMessage], system: &str) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            messages: messages.to_vec(),
        });

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();

        let reply = self
            .rules
            .iter()
            .find(|(keyword, _)| last_user.contains(keyword.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(ChatResponse::from_text(reply))
    }
}

/// Fails every call with a transport-style error
pub struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-1"
    }

    async fn generate(&self, _messages: &[ChatMessage], _system: &str) -> Result<ChatResponse> {
        Err(anyhow!("connection reset by peer"))
    }
}

/// Sleeps before replying
pub struct SlowProvider {
    pub delay: Duration,
    pub text: String,
}

impl SlowProvider {
    pub fn shared(delay: Duration, text: &str) -> Arc<dyn LlmProvider> {
        Arc::new(Self {
            delay,
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for SlowProvider {
    fn provider_name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-1"
    }

    async fn generate(&self, _messages: &[ChatMessage], _system: &str) -> Result<ChatResponse> {
        tokio::time::sleep(self.delay).await;
        Ok(ChatResponse::from_text(self.text.clone()))
    }
}

/// Coordinator rules used by the help-desk fixtures
pub const HELPDESK_ROUTES: &[(&str, &str)] = &[
    ("billing", "transfer_to_agent: Billing"),
    ("payment", "transfer_to_agent: Billing"),
    ("log in", "transfer_to_agent: Support"),
    ("password", "transfer_to_agent: Support"),
];

/// The help-desk tree: a coordinator with Billing and Support specialists
pub fn helpdesk(
    coordinator: Arc<dyn LlmProvider>,
    billing: Arc<dyn LlmProvider>,
    support: Arc<dyn LlmProvider>,
) -> AgentRegistry {
    AgentRegistry::register(
        Agent::new(
            "HelpDeskCoordinator",
            "Route user requests: Use Billing agent for payment issues, Support agent for technical problems.",
            "Main help desk router.",
            coordinator,
        ),
        vec![
            Agent::new(
                "Billing",
                "You handle billing and payment-related inquiries.",
                "Handles billing inquiries.",
                billing,
            ),
            Agent::new(
                "Support",
                "You provide technical support and troubleshooting assistance.",
                "Handles technical support requests.",
                support,
            ),
        ],
    )
    .expect("help-desk tree is valid")
}
