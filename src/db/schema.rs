//! Persisted record sets

use crate::collection::{ActivationRecord, Item, OrderRecord, SeparatorState};
use crate::view::ModMeta;
use anyhow::{Context, Result};
use rusqlite::Row;

/// One table per record kind, each keyed by profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTable {
    Items,
    Orders,
    Activations,
    Separators,
    Meta,
}

impl RecordTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordTable::Items => "mod_items",
            RecordTable::Orders => "mod_orders",
            RecordTable::Activations => "mod_activations",
            RecordTable::Separators => "mod_separators",
            RecordTable::Meta => "mod_meta",
        }
    }

    pub fn all() -> &'static [RecordTable] {
        &[
            RecordTable::Items,
            RecordTable::Orders,
            RecordTable::Activations,
            RecordTable::Separators,
            RecordTable::Meta,
        ]
    }
}

/// Snapshot of one record kind for a profile
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSet {
    Items(Vec<Item>),
    Orders(Vec<OrderRecord>),
    Activations(Vec<ActivationRecord>),
    Separators(Vec<SeparatorState>),
    Meta(Vec<ModMeta>),
}

impl RecordSet {
    pub fn table(&self) -> RecordTable {
        match self {
            RecordSet::Items(_) => RecordTable::Items,
            RecordSet::Orders(_) => RecordTable::Orders,
            RecordSet::Activations(_) => RecordTable::Activations,
            RecordSet::Separators(_) => RecordTable::Separators,
            RecordSet::Meta(_) => RecordTable::Meta,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            RecordSet::Items(v) => v.len(),
            RecordSet::Orders(v) => v.len(),
            RecordSet::Activations(v) => v.len(),
            RecordSet::Separators(v) => v.len(),
            RecordSet::Meta(v) => v.len(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            RecordSet::Items(v) => serde_json::to_string(v),
            RecordSet::Orders(v) => serde_json::to_string(v),
            RecordSet::Activations(v) => serde_json::to_string(v),
            RecordSet::Separators(v) => serde_json::to_string(v),
            RecordSet::Meta(v) => serde_json::to_string(v),
        };
        json.with_context(|| format!("Failed to serialize {}", self.table().table_name()))
    }

    pub fn from_json(table: RecordTable, json: &str) -> Result<Self> {
        let context = || format!("Failed to parse {}", table.table_name());
        Ok(match table {
            RecordTable::Items => RecordSet::Items(serde_json::from_str(json).with_context(context)?),
            RecordTable::Orders => RecordSet::Orders(serde_json::from_str(json).with_context(context)?),
            RecordTable::Activations => {
                RecordSet::Activations(serde_json::from_str(json).with_context(context)?)
            }
            RecordTable::Separators => {
                RecordSet::Separators(serde_json::from_str(json).with_context(context)?)
            }
            RecordTable::Meta => RecordSet::Meta(serde_json::from_str(json).with_context(context)?),
        })
    }
}

/// Raw row of any record table
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub data: String,
    /// RFC 3339 time of the last save
    pub updated_at: String,
}

impl StoredRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            data: row.get(0)?,
            updated_at: row.get(1)?,
        })
    }
}
