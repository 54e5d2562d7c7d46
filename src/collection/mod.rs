//! Collection model: the ordered sequence of mods and separators
//!
//! Items are kept in load order. Order and activation records live beside
//! the items (see [`records`]) so they can be persisted independently.

pub mod graph;
mod records;

pub use graph::DependencyGraph;
pub use records::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind of mod, which decides activation semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Foundational mod shipped with the game, always active
    BaseMod,
    /// Workshop subscription
    SteamMod,
}

/// How a mod leaves the collection when the user removes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalKind {
    /// Unsubscribe from the workshop item
    Unsubscribe,
    /// Delete the locally installed pack
    Delete,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::BaseMod => "base_mod",
            ItemType::SteamMod => "steam_mod",
        }
    }

    pub fn removal_kind(&self) -> RemovalKind {
        match self {
            ItemType::SteamMod => RemovalKind::Unsubscribe,
            ItemType::BaseMod => RemovalKind::Delete,
        }
    }
}

/// Mod version, either a free-form label or a millisecond timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Timestamp(i64),
    Text(String),
}

impl Version {
    /// Render the version for display.
    ///
    /// Timestamps are shown as a local calendar date; a timestamp outside
    /// chrono's range falls back to the raw number.
    pub fn label(&self) -> String {
        match self {
            Version::Text(text) => text.clone(),
            Version::Timestamp(millis) => chrono::DateTime::from_timestamp_millis(*millis)
                .map(|utc| {
                    utc.with_timezone(&chrono::Local)
                        .format("%Y-%m-%d")
                        .to_string()
                })
                .unwrap_or_else(|| millis.to_string()),
        }
    }
}

/// An installable mod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModItem {
    pub identifier: String,
    pub title: String,
    pub item_type: ItemType,

    /// Identifiers this mod depends on, in declaration order
    #[serde(default)]
    pub required_items: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl ModItem {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            item_type,
            required_items: Vec::new(),
            pack_file_path: None,
            version: None,
        }
    }

    pub fn with_requirements<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_items = required.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_base(&self) -> bool {
        self.item_type == ItemType::BaseMod
    }

    pub fn requires(&self, identifier: &str) -> bool {
        self.required_items.iter().any(|r| r == identifier)
    }
}

/// A group marker; its collapse flag lives in [`SeparatorState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparatorItem {
    pub identifier: String,
    pub title: String,
}

impl SeparatorItem {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
        }
    }
}

/// Entry in the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Mod(ModItem),
    Separator(SeparatorItem),
}

impl Item {
    pub fn identifier(&self) -> &str {
        match self {
            Item::Mod(m) => &m.identifier,
            Item::Separator(s) => &s.identifier,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Item::Mod(m) => &m.title,
            Item::Separator(s) => &s.title,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Item::Separator(_))
    }

    pub fn as_mod(&self) -> Option<&ModItem> {
        match self {
            Item::Mod(m) => Some(m),
            Item::Separator(_) => None,
        }
    }
}

impl From<ModItem> for Item {
    fn from(m: ModItem) -> Self {
        Item::Mod(m)
    }
}

impl From<SeparatorItem> for Item {
    fn from(s: SeparatorItem) -> Self {
        Item::Separator(s)
    }
}

/// Index of `identifier` in `items`
pub fn position(items: &[Item], identifier: &str) -> Option<usize> {
    items.iter().position(|i| i.identifier() == identifier)
}

/// Look up a mod by identifier; separators and unknown ids yield `None`
pub fn find_mod<'a>(items: &'a [Item], identifier: &str) -> Option<&'a ModItem> {
    items
        .iter()
        .find(|i| i.identifier() == identifier)
        .and_then(Item::as_mod)
}

/// End (exclusive) of the section that starts after `start`: the next
/// separator or the end of the list
pub fn section_end(items: &[Item], start: usize) -> usize {
    items
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, item)| item.is_separator())
        .map(|(idx, _)| idx)
        .unwrap_or(items.len())
}

/// Mods grouped under a separator: the contiguous run up to the next
/// separator. Unknown ids and non-separators have no children.
pub fn child_mods<'a>(items: &'a [Item], separator_id: &str) -> Vec<&'a ModItem> {
    let Some(start) = position(items, separator_id) else {
        return Vec::new();
    };
    if !items[start].is_separator() {
        return Vec::new();
    }

    items[start + 1..section_end(items, start)]
        .iter()
        .filter_map(Item::as_mod)
        .collect()
}

/// Positions of every separator, in list order
pub fn separator_positions(items: &[Item]) -> Vec<(usize, &str)> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_separator())
        .map(|(idx, item)| (idx, item.identifier()))
        .collect()
}

/// Identifier → index map for the current sequence
pub fn item_indices(items: &[Item]) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.identifier().to_string(), idx))
        .collect()
}

/// First identifier that occurs more than once in `items`
pub fn duplicate_identifier(items: &[Item]) -> Option<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(Item::identifier)
        .find(|id| !seen.insert(*id))
}

/// Number of mods, separators excluded
pub fn total_mods(items: &[Item]) -> usize {
    items.iter().filter(|i| !i.is_separator()).count()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_child_mods_stop_at_next_separator() {
        let items = vec![sep("S1"), steam("M1"), steam("M2"), sep("S2"), steam("M3")];

        let children: Vec<_> = child_mods(&items, "S1").iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(children, vec!["M1", "M2"]);

        let tail: Vec<_> = child_mods(&items, "S2").iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(tail, vec!["M3"]);

        assert!(child_mods(&items, "M1").is_empty());
        assert!(child_mods(&items, "missing").is_empty());
    }

    #[test]
    fn test_item_json_shape() {
        let json = r#"[
            {"kind": "separator", "identifier": "s", "title": "Graphics"},
            {"kind": "mod", "identifier": "1", "title": "A", "item_type": "steam_mod",
             "required_items": ["2"], "version": 1700000000000},
            {"kind": "mod", "identifier": "2", "title": "B", "item_type": "base_mod", "version": "1.2"}
        ]"#;
        let items: Vec<Item> = serde_json::from_str(json).unwrap();

        assert!(items[0].is_separator());
        let a = items[1].as_mod().unwrap();
        assert_eq!(a.version, Some(Version::Timestamp(1_700_000_000_000)));
        assert!(a.requires("2"));
        assert_eq!(items[2].as_mod().unwrap().version, Some(Version::Text("1.2".into())));
        assert_eq!(total_mods(&items), 2);
    }

    #[test]
    fn test_duplicate_identifier() {
        assert_eq!(duplicate_identifier(&[steam("A"), sep("S"), steam("B")]), None);
        assert_eq!(duplicate_identifier(&[steam("A"), steam("B"), steam("A")]), Some("A"));
        assert_eq!(duplicate_identifier(&[sep("X"), steam("X")]), Some("X"));
    }

    #[test]
    fn test_removal_kind_by_type() {
        assert_eq!(ItemType::SteamMod.removal_kind(), RemovalKind::Unsubscribe);
        assert_eq!(ItemType::BaseMod.removal_kind(), RemovalKind::Delete);
    }

    #[test]
    fn test_version_label() {
        assert_eq!(Version::Text("v2".into()).label(), "v2");
        let label = Version::Timestamp(1_700_000_000_000).label();
        assert!(label.starts_with("2023-11-1"), "{label}");
    }
}
