//! Conversation-history deduplication for execution references.
//!
//! The planner may append a fresh execution entry for the same execution id
//! on every reconnect or restore; rendered naively the history shows the
//! same batch several times. History is replayed in full on every render,
//! so this must be a pure, stable function of the input sequence.

use std::collections::HashMap;

use crate::model::ChatEntry;

/// Collapse repeated execution references to the same execution id,
/// keeping only the most recent.
///
/// Per id, the entry with the greatest timestamp survives; on an exact
/// timestamp tie the entry encountered last in input order wins. Execution
/// entries without a resolvable id and all non-execution entries pass
/// through unchanged, in original order.
pub fn dedupe_execution_entries(entries: &[ChatEntry]) -> Vec<ChatEntry> {
    // Winning input position per execution id.
    let mut winner: HashMap<&str, usize> = HashMap::new();
    for (pos, entry) in entries.iter().enumerate() {
        let Some(id) = entry.execution_id() else {
            continue;
        };
        match winner.get(id) {
            Some(&held) if entries[held].timestamp() > entry.timestamp() => {}
            _ => {
                winner.insert(id, pos);
            }
        }
    }

    entries
        .iter()
        .enumerate()
        .filter(|(pos, entry)| match entry.execution_id() {
            Some(id) => winner.get(id) == Some(pos),
            None => true,
        })
        .map(|(_, entry)| entry.clone())
        .collect()
}
