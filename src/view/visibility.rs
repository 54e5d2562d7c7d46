//! Collapsed-separator visibility

use crate::collection::{is_collapsed, separator_positions, Item, SeparatorState};
use std::collections::HashSet;

/// Identifiers hidden by collapsed separators.
///
/// Every item strictly between a collapsed separator and the next separator
/// (or the end of the list) is hidden. Nothing is hidden when `bypass` is
/// set, which the session does while a search, filter or non-load-order sort
/// is in effect.
pub fn hidden_items(items: &[Item], separators: &[SeparatorState], bypass: bool) -> HashSet<String> {
    let mut hidden = HashSet::new();
    if bypass {
        return hidden;
    }

    let positions = separator_positions(items);
    for (i, (start, identifier)) in positions.iter().enumerate() {
        if !is_collapsed(separators, identifier) {
            continue;
        }
        let end = positions
            .get(i + 1)
            .map(|(idx, _)| *idx)
            .unwrap_or(items.len());

        hidden.extend(
            items[start + 1..end]
                .iter()
                .map(|item| item.identifier().to_string()),
        );
    }

    hidden
}
