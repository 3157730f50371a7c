//! Workspace-local string key/value storage for UI preferences and the
//! per-grade data the purely-local version of the app kept.

use crate::store::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const LOCAL_FILE: &str = "local.json";

pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    pub fn open(workspace: &Path) -> StoreResult<Self> {
        let path = workspace.join(LOCAL_FILE);
        let entries = if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> StoreResult<bool> {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    /// Remove every key matching the predicate, persisting once.
    pub fn remove_where<F>(&mut self, mut pred: F) -> StoreResult<usize>
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|k, _| !pred(k));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Clear everything and load `entries` in its place.
    pub fn replace_all(&mut self, entries: BTreeMap<String, String>) -> StoreResult<()> {
        self.entries = entries;
        self.persist()
    }

    /// Typed read of a JSON-encoded value. Unparseable values read as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unparseable local value");
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let text = serde_json::to_string(value)?;
        self.set(key, text)
    }

    fn persist(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.writing");
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path).map_err(StoreError::Io)
    }
}
