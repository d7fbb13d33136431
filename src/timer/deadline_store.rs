//! Deadline persistence helpers

use std::sync::Arc;
use tracing::debug;

use super::TimerKey;
use crate::store::KeyValueStore;

const DEADLINE_PREFIX: &str = "timerEndTime_";
const WARNING_PREFIX: &str = "timerWarningShown_";

/// Reads and writes a section's absolute deadline and warning flag.
///
/// Safe to call with keys that were never written; absence means "not started".
#[derive(Clone)]
pub struct DeadlineStore {
    store: Arc<dyn KeyValueStore>,
}

impl DeadlineStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored deadline in epoch milliseconds, if any
    pub fn load_deadline(&self, key: &TimerKey) -> Option<i64> {
        let raw = self.store.get(&deadline_key(key))?;
        match raw.trim().parse::<i64>() {
            Ok(deadline) => Some(deadline),
            Err(e) => {
                debug!("Ignoring unparsable deadline {:?} for {}: {}", raw, key, e);
                None
            }
        }
    }

    pub fn save_deadline(&self, key: &TimerKey, deadline_millis: i64) {
        self.store
            .set(&deadline_key(key), &deadline_millis.to_string());
    }

    pub fn load_warning_shown(&self, key: &TimerKey) -> bool {
        self.store
            .get(&warning_key(key))
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn save_warning_shown(&self, key: &TimerKey, shown: bool) {
        self.store
            .set(&warning_key(key), if shown { "true" } else { "false" });
    }

    /// Remove both the deadline and the warning flag
    pub fn clear(&self, key: &TimerKey) {
        self.store.remove(&deadline_key(key));
        self.store.remove(&warning_key(key));
    }
}

impl std::fmt::Debug for DeadlineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineStore").finish_non_exhaustive()
    }
}

fn deadline_key(key: &TimerKey) -> String {
    format!("{}{}", DEADLINE_PREFIX, key)
}

fn warning_key(key: &TimerKey) -> String {
    format!("{}{}", WARNING_PREFIX, key)
}
