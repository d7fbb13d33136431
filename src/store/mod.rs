//! Local key-value storage module
//!
//! String-keyed get/set/remove with last-write-wins semantics. This is the only
//! durable state the application owns; everything else comes from the data service.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persistent string-keyed storage.
///
/// Implementations never surface errors to callers: a read that fails is an absent
/// key and a write that fails is logged and dropped.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}
