//! Shared types for switchboard-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author name used for turns that come from the caller
pub const USER_AUTHOR: &str = "user";

/// What kind of transcript entry a turn is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
    /// The author handed the request to `delegate_to`
    Delegation,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::Delegation => write!(f, "delegation"),
        }
    }
}

/// One immutable entry in a session transcript (an "event")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub id: String,
    /// Shared by every turn appended during the same `run` call
    pub invocation_id: String,
    pub author: String,
    pub role: TurnRole,
    #[serde(default)]
    pub parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_to: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(
        invocation_id: &str,
        author: impl Into<String>,
        role: TurnRole,
        parts: Vec<String>,
        delegate_to: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invocation_id: invocation_id.to_string(),
            author: author.into(),
            role,
            parts,
            delegate_to,
            timestamp: Utc::now(),
        }
    }

    pub fn user(invocation_id: &str, message: Message) -> Self {
        Self::new(invocation_id, USER_AUTHOR, TurnRole::User, message.parts, None)
    }

    /// Whitespace-only text is dropped, so the turn has no parts
    pub fn agent(invocation_id: &str, author: &str, text: String) -> Self {
        Self::new(invocation_id, author, TurnRole::Agent, text_parts(text), None)
    }

    pub fn delegation(invocation_id: &str, author: &str, text: String, target: &str) -> Self {
        let parts = text_parts(text);
        Self::new(
            invocation_id,
            author,
            TurnRole::Delegation,
            parts,
            Some(target.to_string()),
        )
    }

    /// Non-empty text parts joined with newlines
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_text(&self) -> bool {
        self.parts.iter().any(|p| !p.trim().is_empty())
    }
}

fn text_parts(text: String) -> Vec<String> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![text]
    }
}

/// A new user message, built fresh for each `run` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub parts: Vec<String>,
}

impl Message {
    pub fn user(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
        }
    }

    /// Messages are always authored by the caller
    pub fn role(&self) -> TurnRole {
        TurnRole::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_display() {
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::Agent.to_string(), "agent");
        assert_eq!(TurnRole::Delegation.to_string(), "delegation");
    }

    #[test]
    fn test_user_turn_from_message() {
        let turn = Turn::user("inv-1", Message::user_text("hello"));
        assert_eq!(turn.author, USER_AUTHOR);
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.invocation_id, "inv-1");
        assert_eq!(turn.text(), "hello");
        assert!(turn.delegate_to.is_none());
    }

    #[test]
    fn test_delegation_turn_drops_blank_text() {
        let turn = Turn::delegation("inv-1", "Coordinator", "  ".to_string(), "Billing");
        assert!(turn.parts.is_empty());
        assert!(!turn.has_text());
        assert_eq!(turn.delegate_to.as_deref(), Some("Billing"));
    }

    #[test]
    fn test_agent_turn_drops_whitespace_text() {
        let turn = Turn::agent("inv-1", "Support", "  \n".to_string());
        assert!(turn.parts.is_empty());
        assert!(!turn.has_text());
        assert_eq!(turn.text(), "");
    }

    #[test]
    fn test_text_joins_non_empty_parts() {
        let turn = Turn::user(
            "inv-1",
            Message::user(vec!["first".to_string(), String::new(), "second".to_string()]),
        );
        assert_eq!(turn.text(), "first\nsecond");
    }

    #[test]
    fn test_turn_serde_role_lowercase() {
        let turn = Turn::agent("inv-1", "Support", "Try resetting it.".to_string());
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "agent");
        assert!(json.get("delegate_to").is_none());
    }
}
