pub mod file_store;
pub mod value;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub use file_store::JsonFileStore;
pub use value::StoreValue;

use crate::core::error::{LauncherError, LauncherResult};

/// Key/value settings persistence shared by the launcher services.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoreValue>;

    fn set(&self, key: &str, value: StoreValue) -> LauncherResult<()>;

    fn delete(&self, key: &str) -> LauncherResult<()>;
}

/// In-memory store backing the service tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoreValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries_mut(&self) -> LauncherResult<MutexGuard<'_, HashMap<String, StoreValue>>> {
        self.entries
            .lock()
            .map_err(|_| LauncherError::Other("settings store lock poisoned".into()))
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoreValue) -> LauncherResult<()> {
        self.entries_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> LauncherResult<()> {
        self.entries_mut()?.remove(key);
        Ok(())
    }
}
