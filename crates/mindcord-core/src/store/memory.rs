//! In-memory state store, for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{RecordKind, StateStore};
use crate::error::{MindcordError, MindcordResult};

/// Records held in a map; lost on exit.
#[derive(Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<(RecordKind, String), serde_json::Value>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, kind: RecordKind, id: &str) -> MindcordResult<Option<serde_json::Value>> {
        let records = self
            .records
            .read()
            .map_err(|_| MindcordError::storage_read("in-memory store lock poisoned"))?;
        Ok(records.get(&(kind, id.to_string())).cloned())
    }

    fn save(&self, kind: RecordKind, id: &str, record: &serde_json::Value) -> MindcordResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| MindcordError::storage_write("in-memory store lock poisoned"))?;
        records.insert((kind, id.to_string()), record.clone());
        Ok(())
    }

    fn list_ids(&self, kind: RecordKind) -> MindcordResult<Vec<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| MindcordError::storage_read("in-memory store lock poisoned"))?;
        let mut ids: Vec<String> = records
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
