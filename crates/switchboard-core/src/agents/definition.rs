//! Agent definition - the declarative shape of an agent in a config file

use serde::{Deserialize, Serialize};

/// A flat, serializable description of one agent.
///
/// Children are referenced by name through `sub_agents`; the registry
/// resolves the references into a tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentDefinition {
    pub name: String,
    pub instruction: String,
    #[serde(default)]
    pub description: String,
    /// Provider key (e.g. "openai", "google"); `None` uses the default provider
    #[serde(default)]
    pub provider: Option<String>,
    /// Model override for this agent
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sub_agents: Vec<String>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            description: String::new(),
            provider: None,
            model: None,
            sub_agents: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_sub_agents<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_agents = names.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_new() {
        let def = AgentDefinition::new("Billing", "You handle billing.");
        assert_eq!(def.name, "Billing");
        assert!(def.description.is_empty());
        assert!(def.sub_agents.is_empty());
        assert!(def.provider.is_none());
    }

    #[test]
    fn test_definition_deserialize_defaults() {
        let def: AgentDefinition = serde_json::from_value(serde_json::json!({
            "name": "Support",
            "instruction": "You provide technical support."
        }))
        .unwrap();
        assert_eq!(def.name, "Support");
        assert!(def.model.is_none());
        assert!(def.sub_agents.is_empty());
    }

    #[test]
    fn test_definition_builder() {
        let def = AgentDefinition::new("HelpDeskCoordinator", "Route user requests.")
            .with_description("Main help desk router.")
            .with_sub_agents(["Billing", "Support"]);
        assert_eq!(def.sub_agents, vec!["Billing".to_string(), "Support".to_string()]);
        assert_eq!(def.description, "Main help desk router.");
    }
}
