//! Row selection for group drags and bulk toggles

use crate::collection::{position, Item};
use std::collections::HashSet;

/// Selected mod identifiers plus the anchor used for range selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    rows: HashSet<String>,
    anchor: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &HashSet<String> {
        &self.rows
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.rows.contains(identifier)
    }

    /// Click on a row. With `extend` the row is added or removed; without it
    /// the selection becomes just this row.
    pub fn toggle_row(&mut self, identifier: &str, extend: bool) {
        if extend {
            if !self.rows.remove(identifier) {
                self.rows.insert(identifier.to_string());
            }
        } else {
            self.rows.clear();
            self.rows.insert(identifier.to_string());
        }
        self.anchor = Some(identifier.to_string());
    }

    /// Select every mod between `start` and `end` inclusive, in sequence
    /// order. Separators in the span are skipped; unknown ids leave the
    /// selection alone.
    pub fn select_range(&mut self, items: &[Item], start: &str, end: &str) {
        let (Some(a), Some(b)) = (position(items, start), position(items, end)) else {
            return;
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        self.rows = items[lo..=hi]
            .iter()
            .filter(|item| !item.is_separator())
            .map(|item| item.identifier().to_string())
            .collect();
        self.anchor = Some(end.to_string());
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.anchor = None;
    }

    /// Drop identifiers that no longer exist in `items`
    pub fn retain_existing(&mut self, items: &[Item]) {
        let known: HashSet<&str> = items.iter().map(Item::identifier).collect();
        self.rows.retain(|id| known.contains(id.as_str()));
        if self.anchor.as_deref().is_some_and(|a| !known.contains(a)) {
            self.anchor = None;
        }
    }

    /// Selected ids in sequence order
    pub fn ordered<'a>(&self, items: &'a [Item]) -> Vec<&'a str> {
        items
            .iter()
            .map(Item::identifier)
            .filter(|id| self.rows.contains(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::fixtures::*;

    #[test]
    fn test_toggle_row_replace_and_extend() {
        let mut selection = Selection::new();
        selection.toggle_row("a", false);
        selection.toggle_row("b", true);
        assert_eq!(selection.len(), 2);

        selection.toggle_row("a", true);
        assert!(!selection.contains("a"));

        selection.toggle_row("c", false);
        assert_eq!(selection.rows().iter().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(selection.anchor(), Some("c"));
    }

    #[test]
    fn test_select_range_skips_separators() {
        let items = vec![steam("a"), sep("S"), steam("b"), steam("c"), steam("d")];
        let mut selection = Selection::new();

        selection.select_range(&items, "c", "a");
        assert_eq!(selection.ordered(&items), vec!["a", "b", "c"]);

        selection.select_range(&items, "a", "ghost");
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_retain_existing() {
        let items = vec![steam("a")];
        let mut selection = Selection::new();
        selection.toggle_row("a", false);
        selection.toggle_row("gone", true);

        selection.retain_existing(&items);
        assert_eq!(selection.ordered(&items), vec!["a"]);
        assert_eq!(selection.anchor(), None);
    }
}
