//! Generation context - system prompt and transcript conversion per agent

use tracing::debug;

use crate::agents::Agent;
use crate::providers::ChatMessage;
use crate::types::{Turn, TurnRole};

/// Key of the structured delegation directive a coordinator replies with
pub const TRANSFER_KEY: &str = "transfer_to_agent";

/// Build the system prompt an agent is invoked with.
///
/// Agents with children also get the routing hints (one line per child,
/// registration order) and the delegation protocol.
pub fn build_system_prompt(agent: &Agent) -> String {
    let mut prompt = String::new();

    prompt.push_str("# IDENTITY\n\n");
    prompt.push_str(&format!("You are the agent named '{}'.", agent.name()));
    if !agent.description().is_empty() {
        prompt.push_str(&format!(" {}", agent.description()));
    }
    prompt.push_str("\n\n");

    if !agent.instruction().is_empty() {
        prompt.push_str("# INSTRUCTIONS\n\n");
        prompt.push_str(agent.instruction());
        prompt.push_str("\n\n");
    }

    if !agent.is_leaf() {
        prompt.push_str("# AGENTS\n\n");
        prompt.push_str("You can transfer the request to one of these agents:\n");
        for child in agent.children() {
            if child.description().is_empty() {
                prompt.push_str(&format!("- {}\n", child.name()));
            } else {
                prompt.push_str(&format!("- {}: {}\n", child.name(), child.description()));
            }
        }
        prompt.push_str("\n# TRANSFER\n\n");
        prompt.push_str(
            "If one of these agents should handle the request, reply with exactly one line:\n",
        );
        prompt.push_str(&format!("{}: <agent name>\n", TRANSFER_KEY));
        prompt.push_str("Otherwise answer the user directly.\n");
    }

    debug!(
        "Built system prompt for '{}' ({} chars)",
        agent.name(),
        prompt.len()
    );

    prompt
}

/// Convert the transcript into the chat messages `agent_name` sees.
///
/// The agent's own turns are assistant messages. Turns by other agents are
/// handed over as user-side context so the model does not mistake them for
/// its own words. Blank turns are skipped.
pub fn build_messages(transcript: &[Turn], agent_name: &str) -> Vec<ChatMessage> {
    transcript
        .iter()
        .filter(|t| t.has_text())
        .map(|t| match t.role {
            TurnRole::User => ChatMessage::user(t.text()),
            TurnRole::Agent | TurnRole::Delegation if t.author == agent_name => {
                ChatMessage::assistant(t.text())
            }
            TurnRole::Agent | TurnRole::Delegation => {
                ChatMessage::user(format!("For context: [{}] said: {}", t.author, t.text()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatRole;
    use crate::test_support::StaticProvider;
    use crate::types::Message;

    fn helpdesk() -> Agent {
        Agent::new(
            "HelpDeskCoordinator",
            "Route user requests: Use Billing agent for payment issues, Support agent for technical problems.",
            "Main help desk router.",
            StaticProvider::shared("ok"),
        )
        .with_sub_agents(vec![
            Agent::new(
                "Billing",
                "You handle billing and payment-related inquiries.",
                "Handles billing inquiries.",
                StaticProvider::shared("ok"),
            ),
            Agent::new(
                "Support",
                "You provide technical support and troubleshooting assistance.",
                "Handles technical support requests.",
                StaticProvider::shared("ok"),
            ),
        ])
    }

    #[test]
    fn test_coordinator_prompt_lists_children_in_order() {
        let prompt = build_system_prompt(&helpdesk());
        assert!(prompt.contains("HelpDeskCoordinator"));
        assert!(prompt.contains("Route user requests"));
        let billing = prompt.find("- Billing: Handles billing inquiries.").unwrap();
        let support = prompt
            .find("- Support: Handles technical support requests.")
            .unwrap();
        assert!(billing < support);
        assert!(prompt.contains("transfer_to_agent: <agent name>"));
    }

    #[test]
    fn test_leaf_prompt_has_no_transfer_section() {
        let coordinator = helpdesk();
        let prompt = build_system_prompt(&coordinator.children()[0]);
        assert!(prompt.contains("billing and payment-related"));
        assert!(!prompt.contains("# AGENTS"));
        assert!(!prompt.contains(TRANSFER_KEY));
    }

    #[test]
    fn test_section_order() {
        let prompt = build_system_prompt(&helpdesk());
        let identity = prompt.find("IDENTITY").unwrap();
        let instructions = prompt.find("INSTRUCTIONS").unwrap();
        let agents = prompt.find("# AGENTS").unwrap();
        let transfer = prompt.find("# TRANSFER").unwrap();
        assert!(identity < instructions);
        assert!(instructions < agents);
        assert!(agents < transfer);
    }

    #[test]
    fn test_build_messages_roles() {
        let transcript = vec![
            Turn::user("inv-1", Message::user_text("my billing is not working")),
            Turn::delegation(
                "inv-1",
                "HelpDeskCoordinator",
                "transfer_to_agent: Billing".to_string(),
                "Billing",
            ),
            Turn::agent("inv-1", "Billing", "Let me check your invoice.".to_string()),
        ];

        let for_billing = build_messages(&transcript, "Billing");
        assert_eq!(for_billing.len(), 3);
        assert_eq!(for_billing[0].role, ChatRole::User);
        assert_eq!(for_billing[1].role, ChatRole::User);
        assert!(for_billing[1].content.starts_with("For context: [HelpDeskCoordinator] said:"));
        assert_eq!(for_billing[2].role, ChatRole::Assistant);

        let for_coordinator = build_messages(&transcript, "HelpDeskCoordinator");
        assert_eq!(for_coordinator[1].role, ChatRole::Assistant);
        assert_eq!(for_coordinator[2].role, ChatRole::User);
    }

    #[test]
    fn test_build_messages_skips_blank_turns() {
        let transcript = vec![
            Turn::user("inv-1", Message::user_text("hi")),
            Turn::delegation("inv-1", "HelpDeskCoordinator", String::new(), "Support"),
        ];
        assert_eq!(build_messages(&transcript, "Support").len(), 1);
    }
}
