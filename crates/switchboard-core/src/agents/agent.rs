//! Agent - a named instruction bound to a generation capability

use std::sync::Arc;

use crate::providers::LlmProvider;

/// A configured text-generation role.
///
/// Agents hold no per-call state and are shared between the registry and
/// the runner.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instruction: String,
    description: String,
    provider: Arc<dyn LlmProvider>,
    children: Vec<Agent>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model())
            .field("children", &self.children)
            .finish()
    }
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        description: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            description: description.into(),
            provider,
            children: Vec::new(),
        }
    }

    /// Append a child agent this agent may delegate to
    pub fn with_sub_agent(mut self, child: Agent) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child agents, keeping their order
    pub fn with_sub_agents(mut self, children: impl IntoIterator<Item = Agent>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// Children in registration order
    pub fn children(&self) -> &[Agent] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Agent> {
        self.children.iter().find(|c| c.name == name)
    }
}
