use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

use super::{SettingsStore, StoreValue};
use crate::core::error::{LauncherError, LauncherResult};

/// Settings store persisted as a single JSON document.
///
/// Reads are served from memory; every mutation rewrites the file through a
/// temp file and a rename so a crash never leaves a half-written document.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, StoreValue>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; a corrupt file is
    /// logged and also starts empty, the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path).unwrap_or_else(|err| {
            warn!("Cannot read settings at {:?}: {}", path, err);
            BTreeMap::new()
        });

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, StoreValue>) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json).map_err(|source| LauncherError::Io {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|source| LauncherError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn mutate(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, StoreValue>),
    ) -> LauncherResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LauncherError::Other("settings store lock poisoned".into()))?;
        let mut next = entries.clone();
        change(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

fn load_entries(path: &Path) -> LauncherResult<BTreeMap<String, StoreValue>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoreValue) -> LauncherResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn delete(&self, key: &str) -> LauncherResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}
