//! Durable record storage.
//!
//! [`StateStore`] is the raw key-value contract: one JSON record per
//! `(kind, id)`. Backends only guarantee that a single call is atomic for its
//! key. Read-modify-write sequences are serialized one level up by
//! [`EntityStore`], which holds a per-key lock around them.

mod entities;
mod json_file;
mod memory;
mod sqlite;

pub use entities::{EntityStore, PERSONALITY_ID};
pub use json_file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
pub use sqlite::SqliteStateStore;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::MindcordResult;

/// The kind of entity a record holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Personality,
    User,
    Venue,
}

impl RecordKind {
    /// Stable name used for tables, directories and lock keys.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Trait for record storage backends.
pub trait StateStore: Send + Sync {
    /// Load a record, or `None` if it does not exist.
    fn load(&self, kind: RecordKind, id: &str) -> MindcordResult<Option<serde_json::Value>>;

    /// Create or replace a record.
    fn save(&self, kind: RecordKind, id: &str, record: &serde_json::Value) -> MindcordResult<()>;

    /// List the ids of every stored record of a kind.
    fn list_ids(&self, kind: RecordKind) -> MindcordResult<Vec<String>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Open the backend selected by configuration.
pub fn open_state_store(config: &StorageConfig) -> MindcordResult<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStateStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStateStore::new(&config.path)?),
        StorageBackend::Sqlite => {
            let path: &Path = config.path.as_ref();
            let db_path = if path.extension().is_some() {
                path.to_path_buf()
            } else {
                path.join("mindcord.db")
            };
            Arc::new(SqliteStateStore::new(db_path)?)
        }
    };
    tracing::debug!(backend = store.backend_name(), path = %config.path.display(), "Opened state store");
    Ok(store)
}
