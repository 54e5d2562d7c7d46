//! Presentation-side projections of the collection
//!
//! Nothing in here mutates the collection. The session feeds the current
//! items and records through these functions to build the list a host shows.

mod filter;
mod selection;
mod sort;
mod visibility;

pub use filter::*;
pub use selection::*;
pub use sort::*;
pub use visibility::*;

use serde::{Deserialize, Serialize};

/// Per-mod metadata edited by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMeta {
    pub mod_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Category assigned to `mod_id`, if any
pub fn category_of<'a>(meta: &'a [ModMeta], mod_id: &str) -> Option<&'a str> {
    meta.iter()
        .find(|m| m.mod_id == mod_id)
        .and_then(|m| m.category.as_deref())
}
