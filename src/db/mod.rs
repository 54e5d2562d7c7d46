//! SQLite persistence for per-profile record sets
//!
//! Every record kind has its own table holding one JSON array per profile,
//! so each set can be retrieved and saved independently of the others.

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Persistence collaborator: retrieve and save record sets by profile
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Stored set for `profile_id`, or `None` if it was never saved
    async fn retrieve(&self, profile_id: &str, table: RecordTable) -> Result<Option<RecordSet>>;

    /// Replace the stored set of the same kind for `profile_id`
    async fn save(&self, profile_id: &str, records: &RecordSet) -> Result<()>;
}

/// Database wrapper with thread-safe access
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        for table in RecordTable::all() {
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    profile_id TEXT PRIMARY KEY,
                    data TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
                table.table_name()
            ))
            .with_context(|| format!("Failed to create table {}", table.table_name()))?;
        }

        Ok(())
    }

    /// Raw row of `table` for a profile
    pub fn get_record(&self, profile_id: &str, table: RecordTable) -> Result<Option<StoredRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                &format!(
                    "SELECT data, updated_at FROM {} WHERE profile_id = ?1",
                    table.table_name()
                ),
                params![profile_id],
                StoredRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Load and decode a record set
    pub fn load_record_set(&self, profile_id: &str, table: RecordTable) -> Result<Option<RecordSet>> {
        self.get_record(profile_id, table)?
            .map(|record| RecordSet::from_json(table, &record.data))
            .transpose()
    }

    /// Insert or replace a record set
    pub fn store_record_set(&self, profile_id: &str, records: &RecordSet) -> Result<()> {
        let data = records.to_json()?;
        let now = chrono::Utc::now().to_rfc3339();
        let table = records.table().table_name();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {table} (profile_id, data, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(profile_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"
            ),
            params![profile_id, data, now],
        )
        .with_context(|| format!("Failed to save {} for profile '{}'", table, profile_id))?;

        Ok(())
    }

    /// Time of the most recent save of any record set of a profile
    pub fn last_saved(&self, profile_id: &str) -> Result<Option<String>> {
        let mut latest: Option<String> = None;
        for table in RecordTable::all() {
            if let Some(record) = self.get_record(profile_id, *table)? {
                if latest.as_deref().map_or(true, |l| record.updated_at.as_str() > l) {
                    latest = Some(record.updated_at);
                }
            }
        }
        Ok(latest)
    }

    /// Profiles that have a stored item list
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT profile_id FROM {} ORDER BY profile_id",
            RecordTable::Items.table_name()
        ))?;
        let profiles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(profiles)
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn retrieve(&self, profile_id: &str, table: RecordTable) -> Result<Option<RecordSet>> {
        self.load_record_set(profile_id, table)
    }

    async fn save(&self, profile_id: &str, records: &RecordSet) -> Result<()> {
        tracing::trace!(
            "Saving {} {} record(s) for profile '{}'",
            records.len(),
            records.table().table_name(),
            profile_id
        );
        self.store_record_set(profile_id, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{ActivationRecord, SeparatorState};

    #[test]
    fn test_missing_profile_is_absent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_record_set("nobody", RecordTable::Orders).unwrap().is_none());
        assert!(db.list_profiles().unwrap().is_empty());
        assert!(db.last_saved("nobody").unwrap().is_none());
    }

    #[test]
    fn test_last_saved_tracks_newest_table() {
        let db = Database::open_in_memory().unwrap();
        db.store_record_set("p", &RecordSet::Separators(Vec::new())).unwrap();
        let first = db.last_saved("p").unwrap().unwrap();

        db.store_record_set("p", &RecordSet::Orders(Vec::new())).unwrap();
        let second = db.last_saved("p").unwrap().unwrap();

        assert!(second >= first);
        let orders = db.get_record("p", RecordTable::Orders).unwrap().unwrap();
        assert_eq!(orders.updated_at, second);
        assert_eq!(orders.data, "[]");
    }

    #[test]
    fn test_save_replaces_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("nested").join("modkeeper.db")).unwrap();

        let first = RecordSet::Activations(vec![ActivationRecord {
            mod_id: "1".into(),
            is_active: false,
            title: "One".into(),
        }]);
        db.store_record_set("default", &first).unwrap();

        let second = RecordSet::Activations(vec![ActivationRecord {
            mod_id: "1".into(),
            is_active: true,
            title: "One".into(),
        }]);
        db.store_record_set("default", &second).unwrap();

        assert_eq!(
            db.load_record_set("default", RecordTable::Activations).unwrap(),
            Some(second)
        );
        // Other tables stay untouched
        assert!(db.load_record_set("default", RecordTable::Separators).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_store_keys_by_profile() {
        let db = Database::open_in_memory().unwrap();
        let states = RecordSet::Separators(vec![SeparatorState {
            identifier: "s".into(),
            collapsed: true,
        }]);

        db.save("a", &states).await.unwrap();
        db.save("b", &RecordSet::Separators(Vec::new())).await.unwrap();

        assert_eq!(db.retrieve("a", RecordTable::Separators).await.unwrap(), Some(states));
        assert_eq!(
            db.retrieve("b", RecordTable::Separators).await.unwrap(),
            Some(RecordSet::Separators(Vec::new()))
        );
    }
}
