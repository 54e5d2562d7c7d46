//! Order mutation engine
//!
//! Turns a drag gesture into a new item sequence. Three gestures exist:
//! single item, multi-selection group, and a collapsed separator dragged
//! together with its hidden section. All three reduce to moving one block of
//! items and then renumbering the load order.

use crate::collection::{is_collapsed, order_records, position, section_end, Item, OrderRecord, SeparatorState};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Which kind of move a drag resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Single,
    Group,
    CollapsedSection,
}

/// Broken position invariant; always a programming error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("mod '{0}' has {1} order records")]
    RecordCount(String, usize),
    #[error("order record '{0}' claims position {1}, which is out of range")]
    OutOfRange(String, usize),
    #[error("order record '{0}' claims position {1}, which holds '{2}'")]
    Misaligned(String, usize, String),
    #[error("position {0} is claimed more than once")]
    Duplicate(usize),
}

/// A settled move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub kind: MoveKind,
    pub items: Vec<Item>,
    /// Full record set for the new sequence
    pub orders: Vec<OrderRecord>,
    /// Mods whose position changed
    pub dirty: Vec<String>,
}

/// Pick the move kind for dragging `active`.
///
/// A selected item inside a multi-selection drags the whole selection; a
/// collapsed separator drags its section; anything else moves alone.
pub fn resolve_kind(
    items: &[Item],
    selection: &HashSet<String>,
    separators: &[SeparatorState],
    active: &str,
) -> MoveKind {
    if selection.len() > 1 && selection.contains(active) {
        return MoveKind::Group;
    }

    let collapsed_separator = items
        .iter()
        .find(|i| i.identifier() == active)
        .is_some_and(|i| i.is_separator() && is_collapsed(separators, active));
    if collapsed_separator {
        MoveKind::CollapsedSection
    } else {
        MoveKind::Single
    }
}

/// Move the items at `block` (ascending indices, containing `active_idx`)
/// onto the position of `over`.
///
/// The block lands after `over` when it started above it and before `over`
/// when it started below it, so a one-item block behaves like a plain
/// remove-and-insert. Returns `None` when `over` is unknown or inside the
/// block.
fn move_block(items: &[Item], block: &[usize], active_idx: usize, over: &str) -> Option<Vec<Item>> {
    let over_idx = position(items, over)?;
    if block.contains(&over_idx) {
        return None;
    }

    let in_block: HashSet<usize> = block.iter().copied().collect();
    let (moved, mut remaining): (Vec<_>, Vec<_>) = items
        .iter()
        .cloned()
        .enumerate()
        .partition(|(idx, _)| in_block.contains(idx));

    let anchor = remaining.iter().position(|(idx, _)| *idx == over_idx)?;
    let insert_at = if active_idx < over_idx { anchor + 1 } else { anchor };
    remaining.splice(insert_at..insert_at, moved);

    Some(remaining.into_iter().map(|(_, item)| item).collect())
}

/// Remove `active` and reinsert it at the position of `over`
pub fn move_single(items: &[Item], active: &str, over: &str) -> Option<Vec<Item>> {
    let active_idx = position(items, active)?;
    move_block(items, &[active_idx], active_idx, over)
}

/// Move every selected item as one contiguous block, keeping their relative
/// order. Selected ids missing from `items` are ignored.
pub fn move_group(
    items: &[Item],
    selection: &HashSet<String>,
    active: &str,
    over: &str,
) -> Option<Vec<Item>> {
    let active_idx = position(items, active)?;
    let block: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| selection.contains(item.identifier()))
        .map(|(idx, _)| idx)
        .collect();
    if !block.contains(&active_idx) {
        return None;
    }

    move_block(items, &block, active_idx, over)
}

/// Move a separator together with every item up to the next separator
pub fn move_collapsed_section(items: &[Item], active: &str, over: &str) -> Option<Vec<Item>> {
    let active_idx = position(items, active)?;
    let block: Vec<usize> = (active_idx..section_end(items, active_idx)).collect();
    move_block(items, &block, active_idx, over)
}

/// Apply a drag of `active` onto `over`.
///
/// Returns `None` for a no-op: no destination, `over == active`, or a
/// destination the gesture cannot land on.
pub fn apply_move(
    items: &[Item],
    previous: &[OrderRecord],
    kind: MoveKind,
    selection: &HashSet<String>,
    active: &str,
    over: Option<&str>,
) -> Option<MoveOutcome> {
    let over = over?;
    if over == active {
        return None;
    }

    let moved = match kind {
        MoveKind::Single => move_single(items, active, over),
        MoveKind::Group => move_group(items, selection, active, over),
        MoveKind::CollapsedSection => move_collapsed_section(items, active, over),
    }?;

    let orders = order_records(&moved);
    let dirty = dirty_records(previous, &orders);
    tracing::debug!(
        "{:?} move of '{}' onto '{}': {} record(s) changed",
        kind,
        active,
        over,
        dirty.len()
    );

    Some(MoveOutcome {
        kind,
        items: moved,
        orders,
        dirty,
    })
}

/// Mods whose order differs between `previous` and `current`
pub fn dirty_records(previous: &[OrderRecord], current: &[OrderRecord]) -> Vec<String> {
    let before: HashMap<&str, usize> = previous
        .iter()
        .map(|r| (r.mod_id.as_str(), r.order))
        .collect();

    current
        .iter()
        .filter(|r| before.get(r.mod_id.as_str()) != Some(&r.order))
        .map(|r| r.mod_id.clone())
        .collect()
}

/// Check that `orders` and the separator positions of `items` form a dense
/// permutation of `0..items.len()`.
pub fn validate_positions(items: &[Item], orders: &[OrderRecord]) -> Result<(), OrderError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in orders {
        *counts.entry(record.mod_id.as_str()).or_default() += 1;
    }
    for item in items.iter().filter_map(Item::as_mod) {
        let count = counts.get(item.identifier.as_str()).copied().unwrap_or(0);
        if count != 1 {
            return Err(OrderError::RecordCount(item.identifier.clone(), count));
        }
    }

    let mut claimed = HashSet::new();
    for record in orders {
        let Some(item) = items.get(record.order) else {
            return Err(OrderError::OutOfRange(record.mod_id.clone(), record.order));
        };
        if item.identifier() != record.mod_id {
            return Err(OrderError::Misaligned(
                record.mod_id.clone(),
                record.order,
                item.identifier().to_string(),
            ));
        }
        if !claimed.insert(record.order) {
            return Err(OrderError::Duplicate(record.order));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures::*;

    fn selection(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn collapsed(ids: &[&str]) -> Vec<SeparatorState> {
        ids.iter()
            .map(|id| SeparatorState {
                identifier: id.to_string(),
                collapsed: true,
            })
            .collect()
    }

    fn assert_dense(items: &[Item], orders: &[OrderRecord]) {
        validate_positions(items, orders).unwrap();
        let mut positions: Vec<usize> = orders.iter().map(|o| o.order).collect();
        positions.extend(
            items
                .iter()
                .enumerate()
                .filter(|(_, i)| i.is_separator())
                .map(|(idx, _)| idx),
        );
        positions.sort_unstable();
        assert_eq!(positions, (0..items.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_move_both_directions() {
        let items = vec![steam("A"), steam("B"), steam("C"), steam("D")];

        let down = move_single(&items, "A", "C").unwrap();
        assert_eq!(ids(&down), vec!["B", "C", "A", "D"]);

        let up = move_single(&items, "D", "B").unwrap();
        assert_eq!(ids(&up), vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn test_noop_moves() {
        let items = vec![steam("A"), steam("B")];
        let orders = order_records(&items);
        let none = HashSet::new();

        assert!(apply_move(&items, &orders, MoveKind::Single, &none, "A", Some("A")).is_none());
        assert!(apply_move(&items, &orders, MoveKind::Single, &none, "A", None).is_none());
        assert!(apply_move(&items, &orders, MoveKind::Single, &none, "A", Some("ghost")).is_none());
        assert!(apply_move(&items, &orders, MoveKind::Single, &none, "ghost", Some("A")).is_none());
    }

    #[test]
    fn test_collapsed_section_moves_as_block() {
        let items = vec![sep("S1"), steam("M1"), steam("M2"), sep("S2"), steam("M3")];
        let orders = order_records(&items);
        let states = collapsed(&["S1"]);

        let kind = resolve_kind(&items, &HashSet::new(), &states, "S1");
        assert_eq!(kind, MoveKind::CollapsedSection);

        let outcome = apply_move(&items, &orders, kind, &HashSet::new(), "S1", Some("S2")).unwrap();
        assert_eq!(ids(&outcome.items), vec!["S2", "S1", "M1", "M2", "M3"]);
        assert_dense(&outcome.items, &outcome.orders);
        assert_eq!(outcome.dirty, vec!["M1", "M2"]);

        // Dropping a section onto one of its own items goes nowhere
        assert!(move_collapsed_section(&items, "S1", "M2").is_none());
    }

    #[test]
    fn test_group_move_keeps_relative_order() {
        let items = vec![steam("M1"), steam("M2"), steam("M3"), steam("M4")];
        let selected = selection(&["M1", "M3"]);

        assert_eq!(resolve_kind(&items, &selected, &[], "M1"), MoveKind::Group);
        let moved = move_group(&items, &selected, "M1", "M2").unwrap();
        assert_eq!(ids(&moved), vec!["M2", "M1", "M3", "M4"]);

        let moved = move_group(&items, &selected, "M3", "M4").unwrap();
        assert_eq!(ids(&moved), vec!["M2", "M4", "M1", "M3"]);

        let up = move_group(&items, &selection(&["M3", "M4"]), "M4", "M1").unwrap();
        assert_eq!(ids(&up), vec!["M3", "M4", "M1", "M2"]);

        // Destination inside the selection is not a move
        assert!(move_group(&items, &selected, "M1", "M3").is_none());
    }

    #[test]
    fn test_resolve_kind_prefers_group() {
        let items = vec![sep("S"), steam("A"), steam("B")];
        let states = collapsed(&["S"]);

        assert_eq!(resolve_kind(&items, &selection(&["A", "B"]), &states, "A"), MoveKind::Group);
        assert_eq!(
            resolve_kind(&items, &selection(&["A", "B"]), &states, "S"),
            MoveKind::CollapsedSection
        );
        assert_eq!(resolve_kind(&items, &selection(&["A"]), &states, "A"), MoveKind::Single);
        assert_eq!(resolve_kind(&items, &HashSet::new(), &[], "S"), MoveKind::Single);
    }

    #[test]
    fn test_positions_stay_dense_across_move_sequences() {
        let mut items = vec![
            sep("S1"),
            steam("A"),
            steam("B"),
            sep("S2"),
            steam("C"),
            steam("D"),
            sep("S3"),
            steam("E"),
        ];
        let mut orders = order_records(&items);
        let states = collapsed(&["S2"]);
        let gestures: &[(&str, &str, &[&str])] = &[
            ("A", "E", &[]),
            ("S2", "S1", &[]),
            ("B", "C", &["B", "D"]),
            ("E", "S3", &[]),
            ("S1", "A", &[]),
            ("D", "S2", &["A", "D", "E"]),
            ("S2", "E", &[]),
        ];

        for (active, over, selected) in gestures {
            let selected = selection(selected);
            let kind = resolve_kind(&items, &selected, &states, active);
            if let Some(outcome) = apply_move(&items, &orders, kind, &selected, active, Some(*over)) {
                items = outcome.items;
                orders = outcome.orders;
            }
            assert_dense(&items, &orders);
        }
    }

    #[test]
    fn test_validate_positions_detects_damage() {
        let items = vec![steam("A"), sep("S"), steam("B")];
        let mut orders = order_records(&items);
        assert!(validate_positions(&items, &orders).is_ok());

        orders[1].order = 0;
        assert!(matches!(
            validate_positions(&items, &orders),
            Err(OrderError::Misaligned(..))
        ));

        orders.pop();
        assert_eq!(
            validate_positions(&items, &orders),
            Err(OrderError::RecordCount("B".into(), 0))
        );
    }
}
