//! Order, activation and separator records kept beside the collection

use super::{Item, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identifier of the one base mod that may be switched off
pub const DEFAULT_ALWAYS_ACTIVE_EXCEPTION: &str = "BirthAndDeath";

/// Load order position of a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub mod_id: String,
    pub order: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_file_path: Option<String>,
}

/// Whether a mod is active in the profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub mod_id: String,
    pub is_active: bool,
    pub title: String,
}

/// Collapse flag of a separator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparatorState {
    pub identifier: String,
    pub collapsed: bool,
}

/// Is the separator collapsed? Unknown separators are expanded.
pub fn is_collapsed(states: &[SeparatorState], identifier: &str) -> bool {
    states
        .iter()
        .any(|s| s.identifier == identifier && s.collapsed)
}

/// Current activation of a mod, `None` when it has no record
pub fn activation_of(records: &[ActivationRecord], mod_id: &str) -> Option<bool> {
    records
        .iter()
        .find(|r| r.mod_id == mod_id)
        .map(|r| r.is_active)
}

/// Rebuild order records from the item sequence.
///
/// A mod's `order` is its index in the full sequence, so separators occupy
/// the positions no record claims.
pub fn order_records(items: &[Item]) -> Vec<OrderRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            item.as_mod().map(|m| OrderRecord {
                mod_id: m.identifier.clone(),
                order: idx,
                title: m.title.clone(),
                pack_file_path: m.pack_file_path.clone(),
            })
        })
        .collect()
}

/// Records loaded from storage, aligned with the items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledRecords {
    pub orders: Vec<OrderRecord>,
    pub activations: Vec<ActivationRecord>,
    pub separators: Vec<SeparatorState>,
}

/// Align persisted records with the current items.
///
/// Mods without a record get a default one, records without a mod are
/// dropped, and duplicates keep their first occurrence. Order records are
/// rebuilt from the sequence, which is persisted in load order.
pub fn reconcile(
    items: &[Item],
    activations: Vec<ActivationRecord>,
    separators: Vec<SeparatorState>,
) -> ReconciledRecords {
    let mut stored: HashMap<String, ActivationRecord> = HashMap::new();
    for record in activations {
        stored.entry(record.mod_id.clone()).or_insert(record);
    }

    let mut created = 0usize;
    let activations: Vec<ActivationRecord> = items
        .iter()
        .filter_map(Item::as_mod)
        .map(|m| match stored.remove(&m.identifier) {
            Some(record) => ActivationRecord {
                title: m.title.clone(),
                ..record
            },
            None => {
                created += 1;
                ActivationRecord {
                    mod_id: m.identifier.clone(),
                    is_active: m.item_type == ItemType::BaseMod,
                    title: m.title.clone(),
                }
            }
        })
        .collect();

    let separator_ids: HashSet<&str> = items
        .iter()
        .filter(|i| i.is_separator())
        .map(Item::identifier)
        .collect();
    let mut seen = HashSet::new();
    let separators: Vec<SeparatorState> = separators
        .into_iter()
        .filter(|s| separator_ids.contains(s.identifier.as_str()))
        .filter(|s| seen.insert(s.identifier.clone()))
        .collect();

    if created > 0 || !stored.is_empty() {
        tracing::debug!(
            "Reconciled activation records: {} created, {} orphaned",
            created,
            stored.len()
        );
    }

    ReconciledRecords {
        orders: order_records(items),
        activations,
        separators,
    }
}

/// Apply the always-active rule used whenever activations are persisted:
/// every base mod except `exception` is forced on.
pub fn enforce_always_active(
    items: &[Item],
    activations: &[ActivationRecord],
    exception: &str,
) -> Vec<ActivationRecord> {
    let forced: HashSet<&str> = items
        .iter()
        .filter_map(Item::as_mod)
        .filter(|m| m.is_base() && m.identifier != exception)
        .map(|m| m.identifier.as_str())
        .collect();

    activations
        .iter()
        .map(|record| {
            if forced.contains(record.mod_id.as_str()) {
                ActivationRecord {
                    is_active: true,
                    ..record.clone()
                }
            } else {
                record.clone()
            }
        })
        .collect()
}
