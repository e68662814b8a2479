//! Agent registry - validates and holds the static agent tree

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::agent::Agent;
use super::definition::AgentDefinition;
use crate::error::{Result, SwitchboardError};
use crate::providers::LlmProvider;

/// Holds the validated agent tree with the coordinator at its root
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    root: Agent,
}

impl AgentRegistry {
    /// Attach `children` to `coordinator` and validate the resulting tree.
    ///
    /// Fails if two siblings share a name, if an agent appears as its own
    /// descendant, or if any name is blank.
    pub fn register(coordinator: Agent, children: Vec<Agent>) -> Result<Self> {
        Self::from_root(coordinator.with_sub_agents(children))
    }

    /// Validate an already-assembled tree
    pub fn from_root(root: Agent) -> Result<Self> {
        let mut path = Vec::new();
        validate(&root, &mut path)?;

        let registry = Self { root };
        info!(
            "AgentRegistry: registered coordinator '{}' with {} agents",
            registry.root.name(),
            registry.len()
        );
        Ok(registry)
    }

    /// Build the tree from flat definitions, starting at `root`.
    ///
    /// `resolve` supplies the generation capability of each definition.
    pub fn from_definitions<F>(defs: &[AgentDefinition], root: &str, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&AgentDefinition) -> anyhow::Result<Arc<dyn LlmProvider>>,
    {
        let mut by_name: HashMap<&str, &AgentDefinition> = HashMap::new();
        for def in defs {
            if by_name.insert(def.name.as_str(), def).is_some() {
                return Err(SwitchboardError::configuration(format!(
                    "agent '{}' is defined more than once",
                    def.name
                )));
            }
        }

        if !by_name.contains_key(root) {
            return Err(SwitchboardError::configuration(format!(
                "root agent '{}' is not defined",
                root
            )));
        }

        let mut stack = Vec::new();
        let tree = build(root, &by_name, &mut stack, &mut resolve)?;
        Self::from_root(tree)
    }

    /// The coordinator
    pub fn root(&self) -> &Agent {
        &self.root
    }

    /// First agent with this name in depth-first order
    pub fn find(&self, name: &str) -> Option<&Agent> {
        find_in(&self.root, name)
    }

    /// All agent names, depth-first, children in registration order
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_names(&self.root, &mut out);
        out
    }

    /// Number of agents in the tree, coordinator included
    pub fn len(&self) -> usize {
        self.names().len()
    }

    /// Depth of the tree; a lone coordinator has depth 1
    pub fn depth(&self) -> usize {
        depth_of(&self.root)
    }
}

fn validate<'a>(agent: &'a Agent, path: &mut Vec<&'a str>) -> Result<()> {
    if agent.name().trim().is_empty() {
        return Err(SwitchboardError::configuration("agent name must not be empty"));
    }

    if path.contains(&agent.name()) {
        return Err(SwitchboardError::configuration(format!(
            "agent '{}' appears as its own descendant ({} -> {})",
            agent.name(),
            path.join(" -> "),
            agent.name()
        )));
    }

    let mut siblings = HashSet::new();
    for child in agent.children() {
        if !siblings.insert(child.name()) {
            return Err(SwitchboardError::configuration(format!(
                "agent '{}' has two sub-agents named '{}'",
                agent.name(),
                child.name()
            )));
        }
    }

    path.push(agent.name());
    for child in agent.children() {
        validate(child, path)?;
    }
    path.pop();
    Ok(())
}

fn build<F>(
    name: &str,
    by_name: &HashMap<&str, &AgentDefinition>,
    stack: &mut Vec<String>,
    resolve: &mut F,
) -> Result<Agent>
where
    F: FnMut(&AgentDefinition) -> anyhow::Result<Arc<dyn LlmProvider>>,
{
    if stack.iter().any(|s| s == name) {
        return Err(SwitchboardError::configuration(format!(
            "sub-agent cycle: {} -> {}",
            stack.join(" -> "),
            name
        )));
    }

    let def = by_name.get(name).copied().ok_or_else(|| {
        SwitchboardError::configuration(format!(
            "agent '{}' references undefined sub-agent '{}'",
            stack.last().map(String::as_str).unwrap_or("<root>"),
            name
        ))
    })?;

    let provider = resolve(def).map_err(|e| {
        SwitchboardError::configuration(format!(
            "cannot build generation provider for agent '{}': {:#}",
            def.name, e
        ))
    })?;
    debug!(
        "AgentRegistry: agent '{}' uses {} ({})",
        def.name,
        provider.provider_name(),
        provider.model()
    );

    stack.push(def.name.clone());
    let mut children = Vec::with_capacity(def.sub_agents.len());
    for child in &def.sub_agents {
        children.push(build(child, by_name, stack, resolve)?);
    }
    stack.pop();

    Ok(Agent::new(&def.name, &def.instruction, &def.description, provider).with_sub_agents(children))
}

fn find_in<'a>(agent: &'a Agent, name: &str) -> Option<&'a Agent> {
    if agent.name() == name {
        return Some(agent);
    }
    agent.children().iter().find_map(|c| find_in(c, name))
}

fn collect_names<'a>(agent: &'a Agent, out: &mut Vec<&'a str>) {
    out.push(agent.name());
    for child in agent.children() {
        collect_names(child, out);
    }
}

fn depth_of(agent: &Agent) -> usize {
    1 + agent.children().iter().map(depth_of).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticProvider;

    fn agent(name: &str, description: &str) -> Agent {
        Agent::new(name, "instruction", description, StaticProvider::shared("ok"))
    }

    fn helpdesk_defs() -> Vec<AgentDefinition> {
        vec![
            AgentDefinition::new("HelpDeskCoordinator", "Route user requests.")
                .with_sub_agents(["Billing", "Support"]),
            AgentDefinition::new("Billing", "You handle billing.")
                .with_description("Handles billing inquiries."),
            AgentDefinition::new("Support", "You provide technical support.")
                .with_description("Handles technical support requests."),
        ]
    }

    fn resolve_static(_def: &AgentDefinition) -> anyhow::Result<Arc<dyn LlmProvider>> {
        Ok(StaticProvider::shared("ok"))
    }

    #[test]
    fn test_register_helpdesk() {
        let registry = AgentRegistry::register(
            agent("HelpDeskCoordinator", "Main help desk router."),
            vec![
                agent("Billing", "Handles billing inquiries."),
                agent("Support", "Handles technical support requests."),
            ],
        )
        .unwrap();
        assert_eq!(registry.root().name(), "HelpDeskCoordinator");
        assert_eq!(registry.names(), vec!["HelpDeskCoordinator", "Billing", "Support"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.depth(), 2);
    }

    #[test]
    fn test_register_rejects_duplicate_siblings() {
        let err = AgentRegistry::register(
            agent("Coordinator", ""),
            vec![agent("Billing", "a"), agent("Billing", "b")],
        )
        .unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration { .. }));
        assert!(err.to_string().contains("'Billing'"));
    }

    #[test]
    fn test_register_allows_same_name_in_different_branches() {
        let registry = AgentRegistry::register(
            agent("Coordinator", ""),
            vec![
                agent("Billing", "").with_sub_agent(agent("Escalation", "")),
                agent("Support", "").with_sub_agent(agent("Escalation", "")),
            ],
        );
        assert!(registry.is_ok());
    }

    #[test]
    fn test_register_rejects_self_descendant() {
        let err = AgentRegistry::register(
            agent("Coordinator", ""),
            vec![agent("Support", "").with_sub_agent(agent("Coordinator", ""))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("own descendant"));
    }

    #[test]
    fn test_register_rejects_blank_name() {
        let err = AgentRegistry::register(agent("Coordinator", ""), vec![agent("  ", "")])
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration { .. }));
    }

    #[test]
    fn test_find() {
        let registry = AgentRegistry::register(
            agent("Coordinator", ""),
            vec![agent("Billing", "").with_sub_agent(agent("Refunds", ""))],
        )
        .unwrap();
        assert_eq!(registry.find("Refunds").map(|a| a.name()), Some("Refunds"));
        assert!(registry.find("Nobody").is_none());
    }

    #[test]
    fn test_from_definitions() {
        let registry =
            AgentRegistry::from_definitions(&helpdesk_defs(), "HelpDeskCoordinator", resolve_static)
                .unwrap();
        let root = registry.root();
        assert_eq!(root.instruction(), "Route user requests.");
        assert_eq!(root.children()[0].name(), "Billing");
        assert_eq!(root.children()[1].description(), "Handles technical support requests.");
    }

    #[test]
    fn test_from_definitions_unknown_root() {
        let err = AgentRegistry::from_definitions(&helpdesk_defs(), "Nobody", resolve_static)
            .unwrap_err();
        assert!(err.to_string().contains("root agent 'Nobody'"));
    }

    #[test]
    fn test_from_definitions_unknown_sub_agent() {
        let mut defs = helpdesk_defs();
        defs[0].sub_agents.push("Sales".to_string());
        let err = AgentRegistry::from_definitions(&defs, "HelpDeskCoordinator", resolve_static)
            .unwrap_err();
        assert!(err.to_string().contains("undefined sub-agent 'Sales'"));
    }

    #[test]
    fn test_from_definitions_duplicate_definition() {
        let mut defs = helpdesk_defs();
        defs.push(AgentDefinition::new("Billing", "again"));
        let err = AgentRegistry::from_definitions(&defs, "HelpDeskCoordinator", resolve_static)
            .unwrap_err();
        assert!(err.to_string().contains("defined more than once"));
    }

    #[test]
    fn test_from_definitions_detects_cycle() {
        let mut defs = helpdesk_defs();
        defs[2].sub_agents.push("HelpDeskCoordinator".to_string());
        let err = AgentRegistry::from_definitions(&defs, "HelpDeskCoordinator", resolve_static)
            .unwrap_err();
        assert!(err.to_string().contains("HelpDeskCoordinator -> Support -> HelpDeskCoordinator"));
    }

    #[test]
    fn test_from_definitions_duplicate_reference_is_sibling_clash() {
        let mut defs = helpdesk_defs();
        defs[0].sub_agents.push("Billing".to_string());
        let err = AgentRegistry::from_definitions(&defs, "HelpDeskCoordinator", resolve_static)
            .unwrap_err();
        assert!(err.to_string().contains("two sub-agents named 'Billing'"));
    }

    #[test]
    fn test_from_definitions_resolver_failure() {
        let err = AgentRegistry::from_definitions(&helpdesk_defs(), "HelpDeskCoordinator", |_| {
            Err(anyhow::anyhow!("provider 'openai' is not configured"))
        })
        .unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration { .. }));
        assert!(err.to_string().contains("not configured"));
    }
}
