//! Sort modes for the presented list

use super::{category_of, ModMeta};
use crate::collection::{Item, Version};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Active sort key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Collection sequence; the only mode where separators, selection and
    /// drag reordering mean anything
    #[default]
    LoadOrder,
    Title,
    Category,
    Version,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::LoadOrder => "load_order",
            SortBy::Title => "title",
            SortBy::Category => "category",
            SortBy::Version => "version",
        }
    }

    pub fn from_cli(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "load_order" | "order" => Ok(SortBy::LoadOrder),
            "title" | "name" => Ok(SortBy::Title),
            "category" => Ok(SortBy::Category),
            "version" => Ok(SortBy::Version),
            other => bail!(
                "Invalid sort mode '{}'. Valid values: load_order, title, category, version",
                other
            ),
        }
    }

    pub fn is_load_order(&self) -> bool {
        *self == SortBy::LoadOrder
    }
}

fn compare_versions(a: Option<&Version>, b: Option<&Version>) -> Ordering {
    match (a, b) {
        (Some(Version::Timestamp(x)), Some(Version::Timestamp(y))) => x.cmp(y),
        (Some(Version::Text(x)), Some(Version::Text(y))) => x.cmp(y),
        (Some(Version::Timestamp(_)), Some(Version::Text(_))) => Ordering::Less,
        (Some(Version::Text(_)), Some(Version::Timestamp(_))) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_categories(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order `items` by `sort_by`.
///
/// Load order keeps the sequence untouched. Every other mode lists mods only,
/// sorted stably so ties keep their load order; uncategorised and unversioned
/// mods go last.
pub fn sort_items<'a>(items: Vec<&'a Item>, sort_by: SortBy, meta: &[ModMeta]) -> Vec<&'a Item> {
    if sort_by.is_load_order() {
        return items;
    }

    let mut mods: Vec<&Item> = items.into_iter().filter(|i| !i.is_separator()).collect();
    mods.sort_by(|a, b| match sort_by {
        SortBy::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        SortBy::Category => compare_categories(
            category_of(meta, a.identifier()),
            category_of(meta, b.identifier()),
        ),
        SortBy::Version => compare_versions(
            a.as_mod().and_then(|m| m.version.as_ref()),
            b.as_mod().and_then(|m| m.version.as_ref()),
        ),
        SortBy::LoadOrder => Ordering::Equal,
    });
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures::*;
    use crate::collection::{ItemType, ModItem};

    fn versioned(id: &str, version: Option<Version>) -> Item {
        let mut m = ModItem::new(id, id, ItemType::SteamMod);
        m.version = version;
        Item::Mod(m)
    }

    #[test]
    fn test_load_order_keeps_separators() {
        let items = vec![sep("S"), steam("b"), steam("a")];
        let sorted = sort_items(items.iter().collect(), SortBy::LoadOrder, &[]);
        assert_eq!(sorted.iter().map(|i| i.identifier()).collect::<Vec<_>>(), vec!["S", "b", "a"]);
    }

    #[test]
    fn test_title_sort_drops_separators() {
        let items = vec![sep("S"), steam("b"), steam("a")];
        let sorted = sort_items(items.iter().collect(), SortBy::Title, &[]);
        assert_eq!(sorted.iter().map(|i| i.identifier()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_category_sort_puts_uncategorised_last() {
        let items = vec![steam("x"), steam("y"), steam("z")];
        let meta = vec![
            ModMeta { mod_id: "y".into(), category: Some("Units".into()) },
            ModMeta { mod_id: "z".into(), category: Some("audio".into()) },
        ];
        let sorted = sort_items(items.iter().collect(), SortBy::Category, &meta);
        assert_eq!(sorted.iter().map(|i| i.identifier()).collect::<Vec<_>>(), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_version_sort() {
        let items = vec![
            versioned("none", None),
            versioned("text", Some(Version::Text("1.0".into()))),
            versioned("new", Some(Version::Timestamp(2_000))),
            versioned("old", Some(Version::Timestamp(1_000))),
        ];
        let sorted = sort_items(items.iter().collect(), SortBy::Version, &[]);
        assert_eq!(
            sorted.iter().map(|i| i.identifier()).collect::<Vec<_>>(),
            vec!["old", "new", "text", "none"]
        );
    }

    #[test]
    fn test_sort_from_cli() {
        assert_eq!(SortBy::from_cli("load-order").unwrap(), SortBy::LoadOrder);
        assert!(SortBy::from_cli("random").is_err());
    }
}
