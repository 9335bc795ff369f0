//! Persistent key-value storage seam
//!
//! The engine coordinates state across browsing contexts through shared
//! storage it does not own. Platform integrations implement [`KeyValueStore`]
//! over whatever the host provides (web storage, a preferences file, ...);
//! this module ships an in-memory store and a JSON-file-backed store.
//!
//! Storage loss must degrade gracefully, never crash the application: every
//! operation on an unavailable store is a silent no-op and reads return
//! `None`. Implementations must not panic or propagate errors.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// String key-value store shared between browsing contexts.
///
/// All operations are infallible from the caller's perspective; a failing
/// backend behaves like an empty store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing or unreadable keys return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Failures are swallowed.
    fn set(&self, key: &str, value: &str);

    /// Remove a key. Removing a missing key is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory store, also the tab-scoped session store in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct StorageFormat {
    entries: HashMap<String, String>,
}

/// JSON-file-backed store with an in-memory cache.
///
/// Every write persists the full entry map; a file that cannot be read or
/// parsed starts the store empty rather than failing construction, and write
/// errors are logged and dropped.
pub struct FileStore {
    storage_path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn new(storage_path: PathBuf) -> Self {
        let entries = Self::load(&storage_path);
        Self {
            storage_path,
            cache: RwLock::new(entries),
        }
    }

    fn load(path: &Path) -> HashMap<String, String> {
        if !path.exists() {
            return HashMap::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read store file {}: {}", path.display(), e);
                return HashMap::new();
            }
        };

        match serde_json::from_str::<StorageFormat>(&content) {
            Ok(format) => format.entries,
            Err(e) => {
                warn!("Malformed store file {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    fn save(&self) {
        if let Some(parent) = self.storage_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create store directory: {}", e);
                return;
            }
        }

        let format = StorageFormat {
            entries: self.cache.read().clone(),
        };

        let content = match serde_json::to_string_pretty(&format) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize store: {}", e);
                return;
            }
        };

        if let Err(e) = fs::write(&self.storage_path, content) {
            warn!("Failed to write store file {}: {}", self.storage_path.display(), e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.cache
            .write()
            .insert(key.to_string(), value.to_string());
        self.save();
    }

    fn remove(&self, key: &str) {
        if self.cache.write().remove(key).is_some() {
            self.save();
        }
    }
}

/// Store standing in for a restricted origin where storage access is denied.
/// Reads see nothing, writes go nowhere.
#[derive(Debug, Default)]
pub struct DeniedStore;

impl KeyValueStore for DeniedStore {
    fn get(&self, key: &str) -> Option<String> {
        debug!("Storage read denied for key {}", key);
        None
    }

    fn set(&self, key: &str, _value: &str) {
        debug!("Storage write denied for key {}", key);
    }

    fn remove(&self, _key: &str) {}
}
