//! Activation cascade engine
//!
//! Computes the complete set of activation changes a toggle implies:
//! - Deactivating a workshop mod also deactivates active mods that require it
//! - Activating a workshop mod also activates its inactive requirements
//! - Base mods never take part in a cascade (they are always on)
//!
//! Everything here is pure. Callers receive either the full record batch or a
//! [`PendingConfirmation`], never a partially applied state.

use crate::collection::{activation_of, child_mods, ActivationRecord, DependencyGraph, Item, ItemType, ModItem};
use std::collections::HashSet;

/// Why a toggle needs the user's confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationReason {
    /// Active mods that would be switched off along with the target
    Dependents(Vec<String>),
    /// Inactive requirements that would be switched on along with the target
    MissingDependencies(Vec<String>),
}

impl ConfirmationReason {
    pub fn mod_ids(&self) -> &[String] {
        match self {
            ConfirmationReason::Dependents(ids) => ids,
            ConfirmationReason::MissingDependencies(ids) => ids,
        }
    }
}

/// A toggle that was held back until the user decides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub mod_id: String,
    pub desired: bool,
    pub reason: ConfirmationReason,
}

/// Result of [`request_activation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Full record set to commit in one update
    Applied(Vec<ActivationRecord>),
    /// Nothing changed; ask the user and call again with an override
    PendingConfirmation(PendingConfirmation),
}

/// Copy of `records` with every id in `ids` set to `is_active`
pub fn set_active<S: AsRef<str>>(
    records: &[ActivationRecord],
    ids: &[S],
    is_active: bool,
) -> Vec<ActivationRecord> {
    let ids: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
    records
        .iter()
        .map(|record| {
            if ids.contains(record.mod_id.as_str()) {
                ActivationRecord {
                    is_active,
                    ..record.clone()
                }
            } else {
                record.clone()
            }
        })
        .collect()
}

/// Mods a toggle of `target` to `desired` drags along, one hop deep.
///
/// `records` must already carry the tentative state of `target`.
fn cascade_targets(
    graph: &DependencyGraph<'_>,
    records: &[ActivationRecord],
    target: &ModItem,
    desired: bool,
) -> Vec<String> {
    if target.item_type != ItemType::SteamMod {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let candidates: Vec<&ModItem> = if desired {
        graph
            .requirements(&target.identifier)
            .into_iter()
            .filter(|m| !m.is_base() && activation_of(records, &m.identifier) == Some(false))
            .collect()
    } else {
        graph
            .dependents(&target.identifier)
            .into_iter()
            .filter(|m| activation_of(records, &m.identifier) == Some(true))
            .collect()
    };

    candidates
        .into_iter()
        .map(|m| m.identifier.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Request that `mod_id` become `desired`.
///
/// With `confirmation_required` set and neighbours affected, nothing is
/// applied and a [`PendingConfirmation`] is returned instead. Unknown ids and
/// separators leave the records untouched.
pub fn request_activation(
    items: &[Item],
    records: &[ActivationRecord],
    mod_id: &str,
    desired: bool,
    confirmation_required: bool,
) -> ActivationOutcome {
    let graph = DependencyGraph::new(items);
    let Some(target) = graph.get(mod_id) else {
        tracing::debug!("Activation request for unknown mod '{}' ignored", mod_id);
        return ActivationOutcome::Applied(records.to_vec());
    };

    let tentative = set_active(records, &[mod_id], desired);
    let affected = cascade_targets(&graph, &tentative, target, desired);
    if affected.is_empty() {
        return ActivationOutcome::Applied(tentative);
    }

    if confirmation_required {
        let reason = if desired {
            ConfirmationReason::MissingDependencies(affected)
        } else {
            ConfirmationReason::Dependents(affected)
        };
        return ActivationOutcome::PendingConfirmation(PendingConfirmation {
            mod_id: mod_id.to_string(),
            desired,
            reason,
        });
    }

    tracing::debug!(
        "Cascading {} of '{}' to {} mod(s)",
        if desired { "activation" } else { "deactivation" },
        mod_id,
        affected.len()
    );
    ActivationOutcome::Applied(set_active(&tentative, &affected, desired))
}

/// Toggle every mod in a separator's section.
///
/// Any inactive child turns the whole group on; a fully active group turns
/// off. The dependency cascade then runs for each child without asking.
/// Returns `None` when `separator_id` is not a separator with children.
pub fn toggle_group(
    items: &[Item],
    records: &[ActivationRecord],
    separator_id: &str,
) -> Option<Vec<ActivationRecord>> {
    let children = child_mods(items, separator_id);
    if children.is_empty() {
        return None;
    }

    let desired = children
        .iter()
        .any(|m| activation_of(records, &m.identifier) == Some(false));
    let child_ids: Vec<&str> = children.iter().map(|m| m.identifier.as_str()).collect();
    let mut updated = set_active(records, &child_ids, desired);

    let graph = DependencyGraph::new(items);
    let mut visited: HashSet<&str> = HashSet::new();
    for child in &children {
        if !visited.insert(child.identifier.as_str()) {
            continue;
        }
        let affected = cascade_targets(&graph, &updated, child, desired);
        if !affected.is_empty() {
            updated = set_active(&updated, &affected, desired);
        }
    }

    tracing::debug!(
        "Group '{}' {} ({} children)",
        separator_id,
        if desired { "activated" } else { "deactivated" },
        children.len()
    );
    Some(updated)
}

/// Desired state for a bulk toggle: on if any of `ids` is off
pub fn bulk_desired<S: AsRef<str>>(records: &[ActivationRecord], ids: &[S]) -> bool {
    ids.iter()
        .any(|id| activation_of(records, id.as_ref()) == Some(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures::*;
    use crate::collection::reconcile;

    fn records_with(items: &[Item], active: &[&str]) -> Vec<ActivationRecord> {
        let base = reconcile(items, Vec::new(), Vec::new()).activations;
        let all: Vec<&str> = items.iter().map(Item::identifier).collect();
        set_active(&set_active(&base, &all, false), active, true)
    }

    fn active_ids(records: &[ActivationRecord]) -> Vec<&str> {
        records
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.mod_id.as_str())
            .collect()
    }

    #[test]
    fn test_deactivate_cascades_to_dependents() {
        let items = vec![steam("A"), steam_req("B", &["A"])];
        let records = records_with(&items, &["A", "B"]);

        match request_activation(&items, &records, "A", false, false) {
            ActivationOutcome::Applied(updated) => assert!(active_ids(&updated).is_empty()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_deactivate_with_confirmation_mutates_nothing() {
        let items = vec![steam("A"), steam_req("B", &["A"])];
        let records = records_with(&items, &["A", "B"]);

        let outcome = request_activation(&items, &records, "A", false, true);
        assert_eq!(
            outcome,
            ActivationOutcome::PendingConfirmation(PendingConfirmation {
                mod_id: "A".into(),
                desired: false,
                reason: ConfirmationReason::Dependents(vec!["B".into()]),
            })
        );
        assert_eq!(activation_of(&records, "A"), Some(true));
    }

    #[test]
    fn test_activate_pulls_in_missing_requirements() {
        let items = vec![steam_req("A", &["C", "core"]), steam("C"), base("core")];
        let records = records_with(&items, &[]);

        match request_activation(&items, &records, "A", true, false) {
            ActivationOutcome::Applied(updated) => {
                assert_eq!(active_ids(&updated), vec!["A", "C"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        match request_activation(&items, &records, "A", true, true) {
            ActivationOutcome::PendingConfirmation(pending) => {
                assert_eq!(
                    pending.reason,
                    ConfirmationReason::MissingDependencies(vec!["C".into()])
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_base_mod_toggle_skips_cascade() {
        let items = vec![base("core"), steam_req("B", &["core"])];
        let records = records_with(&items, &["core", "B"]);

        let outcome = request_activation(&items, &records, "core", false, true);
        match outcome {
            ActivationOutcome::Applied(updated) => assert_eq!(active_ids(&updated), vec!["B"]),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_inactive_neighbours_are_noops() {
        let items = vec![steam_req("A", &["ghost"]), steam_req("B", &["A"])];
        let records = records_with(&items, &["A"]);

        assert_eq!(
            request_activation(&items, &records, "ghost", true, true),
            ActivationOutcome::Applied(records.clone())
        );
        // B is inactive so deactivating A needs no confirmation
        match request_activation(&items, &records, "A", false, true) {
            ActivationOutcome::Applied(updated) => assert!(active_ids(&updated).is_empty()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_circular_requirements_terminate() {
        let items = vec![steam_req("A", &["B", "A"]), steam_req("B", &["A"])];
        let records = records_with(&items, &[]);

        match request_activation(&items, &records, "A", true, false) {
            ActivationOutcome::Applied(updated) => assert_eq!(active_ids(&updated), vec!["A", "B"]),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_group_toggle_law() {
        let items = vec![sep("S"), steam("x"), steam("y"), steam("z"), sep("T"), steam("w")];

        let partial = records_with(&items, &["x", "y"]);
        let updated = toggle_group(&items, &partial, "S").unwrap();
        assert_eq!(active_ids(&updated), vec!["x", "y", "z"]);

        let updated = toggle_group(&items, &updated, "S").unwrap();
        assert!(active_ids(&updated).is_empty());

        assert!(toggle_group(&items, &partial, "x").is_none());
    }

    #[test]
    fn test_group_toggle_respects_cross_group_edges() {
        let items = vec![
            sep("S"),
            steam_req("x", &["lib"]),
            sep("T"),
            steam("lib"),
            steam_req("user", &["x"]),
        ];

        let on = toggle_group(&items, &records_with(&items, &[]), "S").unwrap();
        assert_eq!(active_ids(&on), vec!["x", "lib"]);

        let all = records_with(&items, &["x", "lib", "user"]);
        let off = toggle_group(&items, &all, "S").unwrap();
        assert_eq!(active_ids(&off), vec!["lib"]);
    }

    #[test]
    fn test_bulk_desired() {
        let items = vec![steam("a"), steam("b")];
        let records = records_with(&items, &["a"]);
        assert!(bulk_desired(&records, &["a", "b"]));
        assert!(!bulk_desired(&records, &["a"]));
    }
}
