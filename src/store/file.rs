//! File-backed key-value store
//!
//! The whole map is rewritten as a JSON object after every mutation, into a sibling
//! `.tmp` file that is then renamed over the store. Reads are served from memory, so
//! the file is only touched on open and on writes.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use super::KeyValueStore;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tmp_path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => {
                    info!("Loaded {} stored entries from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!("Ignoring corrupt store file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) => {
                debug!("No store file at {} ({}), starting empty", path.display(), e);
                BTreeMap::new()
            }
        };

        let mut tmp_path = path.clone().into_os_string();
        tmp_path.push(".tmp");
        Self {
            path,
            tmp_path: PathBuf::from(tmp_path),
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) {
        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize store: {}", e);
                return;
            }
        };
        // Rename is atomic on one filesystem: a crash leaves the old file or the new one
        let written = fs::write(&self.tmp_path, json)
            .and_then(|()| fs::rename(&self.tmp_path, &self.path));
        if let Err(e) = written {
            warn!("Failed to write store file {}: {}", self.path.display(), e);
        }
    }

    fn mutate<F>(&self, op: &str, f: F)
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        match self.entries.lock() {
            Ok(mut entries) => {
                f(&mut entries);
                self.flush(&entries);
            }
            Err(e) => warn!("Failed to lock file store for {}: {}", op, e),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok().and_then(|e| e.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate("set", |entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate("remove", |entries| {
            entries.remove(key);
        });
    }
}
