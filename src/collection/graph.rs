//! Read-only dependency projection over the collection

use super::{find_mod, Item, ModItem};

/// "Requires" / "required by" view of the items. Every query walks the
/// borrowed items; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct DependencyGraph<'a> {
    items: &'a [Item],
}

impl<'a> DependencyGraph<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        Self { items }
    }

    pub fn get(&self, identifier: &str) -> Option<&'a ModItem> {
        find_mod(self.items, identifier)
    }

    /// Direct requirements of `identifier` that resolve to a mod in the
    /// collection. Unknown ids, separators and self references are skipped.
    pub fn requirements(&self, identifier: &str) -> Vec<&'a ModItem> {
        let Some(m) = self.get(identifier) else {
            return Vec::new();
        };

        m.required_items
            .iter()
            .filter(|r| r.as_str() != identifier)
            .filter_map(|r| self.get(r))
            .collect()
    }

    /// Non-base mods whose requirements include `identifier`
    pub fn dependents(&self, identifier: &str) -> Vec<&'a ModItem> {
        self.items
            .iter()
            .filter_map(Item::as_mod)
            .filter(|m| !m.is_base() && m.identifier != identifier && m.requires(identifier))
            .collect()
    }
}
