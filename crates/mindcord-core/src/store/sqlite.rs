//! SQLite-backed state store.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{RecordKind, StateStore};
use crate::error::{MindcordError, MindcordResult};

/// Records stored as JSON text in a single `records` table.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Create a new store at the given path.
    pub fn new(path: impl AsRef<Path>) -> MindcordResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> MindcordResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MindcordResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MindcordError::storage_read("sqlite connection lock poisoned"))
    }

    fn init_schema(&self) -> MindcordResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind);
        "#,
        )?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self, kind: RecordKind, id: &str) -> MindcordResult<Option<serde_json::Value>> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(MindcordError::from))
            .transpose()
    }

    fn save(&self, kind: RecordKind, id: &str, record: &serde_json::Value) -> MindcordResult<()> {
        let data = serde_json::to_string(record)?;
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO records (kind, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(kind, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
            params![kind.as_str(), id, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn list_ids(&self, kind: RecordKind) -> MindcordResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM records WHERE kind = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_and_load() {
        let store = SqliteStateStore::in_memory().unwrap();
        store.save(RecordKind::User, "u1", &json!({"v": 1})).unwrap();
        store.save(RecordKind::User, "u1", &json!({"v": 2})).unwrap();

        assert_eq!(store.load(RecordKind::User, "u1").unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.list_ids(RecordKind::User).unwrap(), vec!["u1"]);
    }

    #[test]
    fn test_file_backed_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = SqliteStateStore::new(&path).unwrap();
            store
                .save(RecordKind::Personality, "global", &json!({"main_mood": "hyped"}))
                .unwrap();
        }
        let store = SqliteStateStore::new(&path).unwrap();
        assert_eq!(
            store.load(RecordKind::Personality, "global").unwrap(),
            Some(json!({"main_mood": "hyped"}))
        );
    }
}
