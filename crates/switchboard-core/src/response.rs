//! Response extraction

use crate::types::Turn;

/// Reply text for a finished round: the text of the last turn only.
///
/// Returns an empty string when there are no turns or the last turn carries
/// no text. Earlier turns are never consulted, even when they have text.
pub fn extract_reply(turns: &[Turn]) -> String {
    turns.last().map(Turn::text).unwrap_or_default()
}
