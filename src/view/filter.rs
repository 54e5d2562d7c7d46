//! Text/category search and activation filtering

use super::{category_of, ModMeta};
use crate::collection::{activation_of, ActivationRecord, Item};
use anyhow::{bail, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// `C: <category> - <term>`; the term part is optional
const CATEGORY_SEARCH: &str = r"(?i)^c:\s*(.*?)(?:\s+-\s+(.*))?$";

/// Which activation state the list is restricted to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFilter {
    #[default]
    All,
    Active,
    Passive,
}

impl ActivationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationFilter::All => "all",
            ActivationFilter::Active => "active",
            ActivationFilter::Passive => "passive",
        }
    }

    pub fn from_cli(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "all" => Ok(ActivationFilter::All),
            "active" | "on" => Ok(ActivationFilter::Active),
            "passive" | "inactive" | "off" => Ok(ActivationFilter::Passive),
            other => bail!(
                "Invalid activation filter '{}'. Valid values: all, active, passive",
                other
            ),
        }
    }

    fn admits(&self, is_active: Option<bool>) -> bool {
        match self {
            ActivationFilter::All => true,
            ActivationFilter::Active => is_active == Some(true),
            ActivationFilter::Passive => is_active == Some(false),
        }
    }
}

/// Parsed search box text, lowercased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub category: Option<String>,
    pub term: String,
}

impl SearchQuery {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(re) = Regex::new(CATEGORY_SEARCH) {
            if let Some(caps) = re.captures(text) {
                let category = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                let term = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                return Self {
                    category: (!category.is_empty()).then(|| category.to_lowercase()),
                    term: term.to_lowercase(),
                };
            }
        }

        Self {
            category: None,
            term: text.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.term.is_empty()
    }

    fn matches(&self, item: &Item, meta: &[ModMeta]) -> bool {
        if let Some(category) = &self.category {
            let assigned = category_of(meta, item.identifier()).map(str::to_lowercase);
            if !assigned.is_some_and(|c| c.contains(category.as_str())) {
                return false;
            }
        }
        self.term.is_empty() || item.title().to_lowercase().contains(&self.term)
    }
}

/// Restrict `items` to those matching the search text and activation filter.
///
/// Separators carry no activation state and group their section, so they
/// always survive filtering.
pub fn filter_mods<'a>(
    search_text: &str,
    activation_filter: ActivationFilter,
    items: &'a [Item],
    meta: &[ModMeta],
    activations: &[ActivationRecord],
) -> Vec<&'a Item> {
    let query = SearchQuery::parse(search_text);

    items
        .iter()
        .filter(|item| {
            if item.is_separator() {
                return true;
            }
            activation_filter.admits(activation_of(activations, item.identifier()))
                && (query.is_empty() || query.matches(item, meta))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures::*;
    use crate::collection::{ItemType, ModItem};

    fn titled(id: &str, title: &str) -> Item {
        Item::Mod(ModItem::new(id, title, ItemType::SteamMod))
    }

    fn meta(id: &str, category: &str) -> ModMeta {
        ModMeta {
            mod_id: id.to_string(),
            category: Some(category.to_string()),
        }
    }

    fn record(id: &str, active: bool) -> ActivationRecord {
        ActivationRecord {
            mod_id: id.to_string(),
            is_active: active,
            title: String::new(),
        }
    }

    #[test]
    fn test_parse_category_prefix() {
        assert_eq!(
            SearchQuery::parse("C: Graphics - Shader"),
            SearchQuery {
                category: Some("graphics".into()),
                term: "shader".into()
            }
        );
        assert_eq!(
            SearchQuery::parse("c:units"),
            SearchQuery {
                category: Some("units".into()),
                term: String::new()
            }
        );
        assert_eq!(
            SearchQuery::parse("Cavalry"),
            SearchQuery {
                category: None,
                term: "cavalry".into()
            }
        );
    }

    #[test]
    fn test_title_search_is_case_insensitive() {
        let items = vec![sep("S"), titled("1", "Better Cavalry"), titled("2", "Map Overhaul")];
        let shown: Vec<_> = filter_mods("CAVAL", ActivationFilter::All, &items, &[], &[])
            .into_iter()
            .map(Item::identifier)
            .collect();
        assert_eq!(shown, vec!["S", "1"]);
    }

    #[test]
    fn test_category_search() {
        let items = vec![titled("1", "Shader pack"), titled("2", "Shader fix"), titled("3", "Units")];
        let meta = vec![meta("1", "Graphics"), meta("3", "Graphics")];

        let shown: Vec<_> = filter_mods("c: graph - shader", ActivationFilter::All, &items, &meta, &[])
            .into_iter()
            .map(Item::identifier)
            .collect();
        assert_eq!(shown, vec!["1"]);

        let shown: Vec<_> = filter_mods("C:graphics", ActivationFilter::All, &items, &meta, &[])
            .into_iter()
            .map(Item::identifier)
            .collect();
        assert_eq!(shown, vec!["1", "3"]);
    }

    #[test]
    fn test_activation_filter_keeps_separators() {
        let items = vec![sep("S"), steam("on"), steam("off"), steam("unknown")];
        let records = vec![record("on", true), record("off", false)];

        let active: Vec<_> = filter_mods("", ActivationFilter::Active, &items, &[], &records)
            .into_iter()
            .map(Item::identifier)
            .collect();
        assert_eq!(active, vec!["S", "on"]);

        let passive: Vec<_> = filter_mods("", ActivationFilter::Passive, &items, &[], &records)
            .into_iter()
            .map(Item::identifier)
            .collect();
        assert_eq!(passive, vec!["S", "off"]);
    }

    #[test]
    fn test_filter_from_cli() {
        assert_eq!(ActivationFilter::from_cli("Passive").unwrap(), ActivationFilter::Passive);
        assert!(ActivationFilter::from_cli("sometimes").is_err());
    }
}
