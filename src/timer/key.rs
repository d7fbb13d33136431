//! Timer key

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one timed section of one test. Stable across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerKey(String);

impl TimerKey {
    pub fn new(test_id: i64, section_id: i64) -> Self {
        Self(format!("test_{}_section_{}", test_id, section_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
