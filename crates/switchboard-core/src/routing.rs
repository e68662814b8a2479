//! Coordinator routing - turns a coordinator reply into a routing decision
//!
//! A reply is interpreted in this order:
//!
//! 1. A `transfer_to_agent: <name>` directive is a structured delegation. It must
//!    name one of the coordinator's children.
//! 2. Unless routing is strict, the reply is scanned for whole-word,
//!    case-insensitive mentions of child names. When several children are
//!    mentioned, the first one in registration order wins.
//! 3. Any other non-blank reply is a direct answer.
//! 4. A blank reply is a routing failure.

use tracing::{debug, warn};

use crate::agents::Agent;
use crate::context::TRANSFER_KEY;
use crate::error::{Result, SwitchboardError};

/// Outcome of interpreting one coordinator reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Hand the request to the named child
    Delegate { target: String },
    /// The coordinator answered itself
    Answer(String),
}

impl RouteDecision {
    pub fn is_delegation(&self) -> bool {
        matches!(self, Self::Delegate { .. })
    }
}

/// How a decision was reached, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Directive,
    NameMatch,
    Direct,
}

/// Interpret `reply`, produced by `coordinator`, as a routing decision
pub fn interpret(coordinator: &Agent, reply: &str, strict: bool) -> Result<RouteDecision> {
    interpret_with_source(coordinator, reply, strict).map(|(decision, _)| decision)
}

pub fn interpret_with_source(
    coordinator: &Agent,
    reply: &str,
    strict: bool,
) -> Result<(RouteDecision, RouteSource)> {
    if reply.trim().is_empty() {
        return Err(SwitchboardError::no_route(
            coordinator.name(),
            "coordinator returned no text and no delegation",
        ));
    }

    if let Some(requested) = parse_directive(reply) {
        let target = coordinator
            .children()
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(requested))
            .ok_or_else(|| {
                SwitchboardError::no_route(
                    coordinator.name(),
                    format!("transfer requested to unknown agent '{}'", requested),
                )
            })?;
        debug!(
            "Routing: '{}' delegates to '{}' by directive",
            coordinator.name(),
            target.name()
        );
        return Ok((
            RouteDecision::Delegate {
                target: target.name().to_string(),
            },
            RouteSource::Directive,
        ));
    }

    if !strict {
        let matched = mentioned_children(coordinator, reply);
        if let Some(first) = matched.first() {
            if matched.len() > 1 {
                warn!(
                    "Routing: reply from '{}' mentions {:?}; picking '{}' (first in registration order)",
                    coordinator.name(),
                    matched,
                    first
                );
            }
            debug!(
                "Routing: '{}' delegates to '{}' by name match",
                coordinator.name(),
                first
            );
            return Ok((
                RouteDecision::Delegate {
                    target: first.to_string(),
                },
                RouteSource::NameMatch,
            ));
        }
    }

    debug!("Routing: '{}' answered directly", coordinator.name());
    Ok((RouteDecision::Answer(reply.to_string()), RouteSource::Direct))
}

/// Find the first `transfer_to_agent: <name>` directive, returning the name.
///
/// The key may follow a list bullet, a quote marker or other text on the
/// same line, but not a word character.
fn parse_directive(reply: &str) -> Option<&str> {
    reply.lines().find_map(|line| {
        // ASCII lowercasing keeps byte offsets valid for `line`
        let start = line.to_ascii_lowercase().find(TRANSFER_KEY)?;
        if line[..start].chars().next_back().is_some_and(is_word_char) {
            return None;
        }
        let value = line[start + TRANSFER_KEY.len()..]
            .trim_start()
            .strip_prefix(':')?;
        let name = value
            .trim()
            .trim_end_matches('.')
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '*')
            .trim();
        if name.is_empty() { None } else { Some(name) }
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Children whose name occurs as a whole word in `reply`, registration order
fn mentioned_children<'a>(coordinator: &'a Agent, reply: &str) -> Vec<&'a str> {
    let haystack = reply.to_lowercase();
    coordinator
        .children()
        .iter()
        .map(|c| c.name())
        .filter(|name| contains_word(&haystack, &name.to_lowercase()))
        .collect()
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        let before_ok = haystack[..idx].chars().next_back().is_none_or(|c| !is_word_char(c));
        let after_ok = haystack[idx + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c));
        before_ok && after_ok
    })
}
