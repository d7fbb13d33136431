//! In-memory key-value store

use std::{collections::HashMap, sync::Mutex};
use tracing::warn;

use super::KeyValueStore;

/// Volatile store backed by a `HashMap`, used for tests and throwaway runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok().and_then(|e| e.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
            }
            Err(e) => warn!("Failed to lock memory store for write: {}", e),
        }
    }

    fn remove(&self, key: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.remove(key);
            }
            Err(e) => warn!("Failed to lock memory store for remove: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("never-written"), None);
        store.remove("never-written");
        assert!(store.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryStore::new();
        store.set("k", "1");
        store.set("k", "2");
        assert_eq!(store.get("k").as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }
}
