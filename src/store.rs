//! Key-value settings store capability.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::warn;

/// Opaque string store the coordinator persists the device pool into.
pub trait SettingsStore: Send + Sync {
    /// Fetch the value stored under `key`.
    fn load(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    fn store(&self, key: &str, value: &str);
}

/// In-memory store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

/// Store backed by a single JSON file.
///
/// Read and write failures degrade to an absent value or a dropped write
/// with a warning; they are never surfaced to the caller.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store over `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "unreadable settings file");
            HashMap::new()
        })
    }
}

impl SettingsStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn store(&self, key: &str, value: &str) {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        match serde_json::to_string(&map) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    warn!(path = %self.path.display(), error = %e, "failed to write settings file");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode settings"),
        }
    }
}
