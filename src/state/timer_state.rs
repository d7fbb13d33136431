//! Timer state structure and display formatting

use serde::{Deserialize, Serialize};

use crate::timer::CountdownPhase;

/// Remaining time at or below which the clock is shown as urgent
pub const URGENT_THRESHOLD_SECS: u64 = 60;

/// Timer state as reported to the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub active: bool,
    pub remaining_seconds: Option<u64>,
    /// `MM:SS` rendering of `remaining_seconds`
    pub display: Option<String>,
    pub urgent: bool,
}

impl TimerState {
    /// Create an active timer state with remaining seconds
    pub fn active(remaining_seconds: u64) -> Self {
        Self {
            active: true,
            remaining_seconds: Some(remaining_seconds),
            display: Some(format_clock(remaining_seconds)),
            urgent: remaining_seconds <= URGENT_THRESHOLD_SECS,
        }
    }

    /// Create an inactive timer state
    pub fn inactive() -> Self {
        Self {
            active: false,
            remaining_seconds: None,
            display: None,
            urgent: false,
        }
    }

    /// Build from a registry snapshot; anything but a running countdown is inactive
    pub fn from_snapshot(snapshot: Option<(CountdownPhase, u64)>) -> Self {
        match snapshot {
            Some((CountdownPhase::Running, remaining)) => Self::active(remaining),
            _ => Self::inactive(),
        }
    }

    /// Check if the timer is active
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Zero-padded `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
