//! JSON-file state store: one pretty-printed file per record.
//!
//! Layout is `<root>/<kind>/<encoded id>.json`. Writes go to a temporary file
//! in the same directory and are renamed into place, so a reader never sees a
//! half-written record.
//!
//! Ids whose encoded form exceeds [`MAX_STEM_LEN`] are stored as
//! `~<sha256 of id>.json` holding `{"id": .., "record": ..}`, so the id can
//! still be listed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{RecordKind, StateStore};
use crate::error::{MindcordError, MindcordResult};

/// Longest encoded id used verbatim as a file stem. Leaves room for the
/// temporary-file suffix within a 255-byte file name.
pub const MAX_STEM_LEN: usize = 200;

const HASHED_PREFIX: char = '~';

/// File-per-record store rooted at a directory.
pub struct JsonFileStateStore {
    root: PathBuf,
}

impl JsonFileStateStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> MindcordResult<Self> {
        let root = root.as_ref().to_path_buf();
        for kind in [RecordKind::Personality, RecordKind::User, RecordKind::Venue] {
            fs::create_dir_all(root.join(kind.as_str())).map_err(|e| {
                MindcordError::storage_write(format!(
                    "cannot create data directory {}: {}",
                    root.display(),
                    e
                ))
            })?;
        }
        Ok(Self { root })
    }

    /// Path of a record and whether it uses the hashed layout.
    fn record_path(&self, kind: RecordKind, id: &str) -> (PathBuf, bool) {
        let (stem, hashed) = file_stem(id);
        (self.root.join(kind.as_str()).join(format!("{}.json", stem)), hashed)
    }
}

fn read_record(path: &Path) -> MindcordResult<Option<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(MindcordError::storage_read(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    Ok(Some(serde_json::from_str(&content)?))
}

fn malformed(path: &Path) -> MindcordError {
    MindcordError::storage_read(format!("malformed hashed record {}", path.display()))
}

impl StateStore for JsonFileStateStore {
    fn load(&self, kind: RecordKind, id: &str) -> MindcordResult<Option<serde_json::Value>> {
        let (path, hashed) = self.record_path(kind, id);
        let Some(mut value) = read_record(&path)? else {
            return Ok(None);
        };
        if !hashed {
            return Ok(Some(value));
        }
        match value.get_mut("record") {
            Some(record) => Ok(Some(record.take())),
            None => Err(malformed(&path)),
        }
    }

    fn save(&self, kind: RecordKind, id: &str, record: &serde_json::Value) -> MindcordResult<()> {
        let (path, hashed) = self.record_path(kind, id);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        let body = if hashed {
            serde_json::to_string_pretty(&json!({ "id": id, "record": record }))?
        } else {
            serde_json::to_string_pretty(record)?
        };

        fs::write(&tmp, body).map_err(|e| {
            MindcordError::storage_write(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            MindcordError::storage_write(format!("failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn list_ids(&self, kind: RecordKind) -> MindcordResult<Vec<String>> {
        let dir = self.root.join(kind.as_str());
        let entries = fs::read_dir(&dir).map_err(|e| {
            MindcordError::storage_read(format!("failed to list {}: {}", dir.display(), e))
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else { continue };
            if stem.starts_with(HASHED_PREFIX) {
                let path = entry.path();
                let value = read_record(&path)?.ok_or_else(|| malformed(&path))?;
                let id = value.get("id").and_then(Value::as_str).ok_or_else(|| malformed(&path))?;
                ids.push(id.to_string());
            } else if let Some(id) = decode_id(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}

/// Make an opaque id safe as a file name: keep `[A-Za-z0-9_-]`, escape
/// everything else as `%XX` per byte.
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// File stem for an id, hashed when the encoded form would be too long.
fn file_stem(id: &str) -> (String, bool) {
    let encoded = encode_id(id);
    if encoded.len() <= MAX_STEM_LEN {
        return (encoded, false);
    }
    let digest = Sha256::digest(id.as_bytes());
    (format!("{}{}", HASHED_PREFIX, hex::encode(digest)), true)
}

fn decode_id(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
