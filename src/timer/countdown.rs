//! Countdown engine state machine

use std::sync::Arc;
use tracing::{debug, info};

use super::{Clock, DeadlineStore, TimerCallbacks, TimerKey, WARNING_THRESHOLD_SECS};

/// Lifecycle of one countdown. `Expired` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    Uninitialized,
    Running,
    Expired,
    Cancelled,
}

/// Result of activating a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Duration was zero or negative; the section is untimed
    Untimed,
    /// No stored deadline, a fresh one was written
    Started { remaining_seconds: u64 },
    /// A future deadline was found in the store
    Resumed { remaining_seconds: u64 },
    /// The stored deadline had already passed; time-up was invoked
    AlreadyExpired,
    /// The host had already finished; no countdown was started
    Finished,
}

impl Activation {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Started { .. } | Self::Resumed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Engine is not running; nothing happened
    Idle,
    Ticked { remaining_seconds: u64 },
    Expired,
}

pub struct Countdown {
    key: TimerKey,
    duration_minutes: i64,
    store: DeadlineStore,
    clock: Arc<dyn Clock>,
    callbacks: Arc<dyn TimerCallbacks>,
    remaining_seconds: u64,
    warning_shown: bool,
    phase: CountdownPhase,
}

impl Countdown {
    pub fn new(
        key: TimerKey,
        duration_minutes: i64,
        store: DeadlineStore,
        clock: Arc<dyn Clock>,
        callbacks: Arc<dyn TimerCallbacks>,
    ) -> Self {
        Self {
            key,
            duration_minutes,
            store,
            clock,
            callbacks,
            remaining_seconds: total_seconds(duration_minutes),
            warning_shown: false,
            phase: CountdownPhase::Uninitialized,
        }
    }

    pub fn key(&self) -> &TimerKey {
        &self.key
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }

    /// Load or create the deadline and enter `Running`.
    ///
    /// Only acts from `Uninitialized`; later calls return the current standing.
    pub fn activate(&mut self) -> Activation {
        if self.phase != CountdownPhase::Uninitialized {
            return match self.phase {
                CountdownPhase::Running => Activation::Resumed {
                    remaining_seconds: self.remaining_seconds,
                },
                _ => Activation::AlreadyExpired,
            };
        }

        if self.duration_minutes <= 0 {
            debug!("Section {} is untimed, no countdown started", self.key);
            self.remaining_seconds = 0;
            return Activation::Untimed;
        }

        let now = self.clock.now_millis();
        let activation = match self.store.load_deadline(&self.key) {
            Some(deadline) if deadline > now => {
                self.remaining_seconds = ceil_seconds(deadline.saturating_sub(now));
                self.warning_shown = self.store.load_warning_shown(&self.key);
                info!(
                    "Resuming countdown for {} with {}s remaining (warning shown: {})",
                    self.key, self.remaining_seconds, self.warning_shown
                );
                Activation::Resumed {
                    remaining_seconds: self.remaining_seconds,
                }
            }
            Some(deadline) => {
                info!(
                    "Stored deadline for {} passed {}ms ago, expiring immediately",
                    self.key,
                    now - deadline
                );
                self.remaining_seconds = 0;
                self.phase = CountdownPhase::Expired;
                self.store.clear(&self.key);
                self.callbacks.on_time_up();
                return Activation::AlreadyExpired;
            }
            None => {
                let total = total_seconds(self.duration_minutes);
                self.store.save_deadline(&self.key, deadline_after(now, total));
                self.store.save_warning_shown(&self.key, false);
                self.remaining_seconds = total;
                self.warning_shown = false;
                info!("Starting {} minute countdown for {}", self.duration_minutes, self.key);
                Activation::Started {
                    remaining_seconds: total,
                }
            }
        };

        self.phase = CountdownPhase::Running;
        activation
    }

    /// Advance one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != CountdownPhase::Running {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        let now = self.clock.now_millis();
        self.store
            .save_deadline(&self.key, deadline_after(now, self.remaining_seconds));

        if self.remaining_seconds == 0 {
            info!("Countdown for {} reached zero", self.key);
            self.phase = CountdownPhase::Expired;
            self.store.clear(&self.key);
            self.callbacks.on_time_up();
            return TickOutcome::Expired;
        }

        if self.remaining_seconds == WARNING_THRESHOLD_SECS && !self.warning_shown {
            info!("Five minutes remaining for {}", self.key);
            self.callbacks.on_five_minute_warning();
            self.warning_shown = true;
            self.store.save_warning_shown(&self.key, true);
        }

        TickOutcome::Ticked {
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Stop for good. Idempotent; a no-op once expired.
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            CountdownPhase::Uninitialized | CountdownPhase::Running => {
                debug!("Cancelling countdown for {}", self.key);
                self.phase = CountdownPhase::Cancelled;
                true
            }
            CountdownPhase::Expired | CountdownPhase::Cancelled => false,
        }
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("key", &self.key)
            .field("duration_minutes", &self.duration_minutes)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("warning_shown", &self.warning_shown)
            .field("phase", &self.phase)
            .finish()
    }
}

/// Allotted seconds; non-positive durations are untimed
fn total_seconds(duration_minutes: i64) -> u64 {
    u64::try_from(duration_minutes)
        .unwrap_or(0)
        .saturating_mul(60)
}

/// Epoch millis `seconds` after `now`, pinned to `i64::MAX` for absurd durations
fn deadline_after(now: i64, seconds: u64) -> i64 {
    let millis = i64::try_from(seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now.saturating_add(millis)
}

fn ceil_seconds(millis: i64) -> u64 {
    (millis.saturating_add(999) / 1000).max(0) as u64
}
