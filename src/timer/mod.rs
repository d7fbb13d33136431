//! Section timer module
//!
//! A per-section countdown whose deadline lives in local storage, so a reload resumes
//! where it left off. The engine is a plain state machine driven by `tick`; the tokio
//! task in `tasks::countdown` supplies the once-per-second wake-up.

pub mod clock;
pub mod countdown;
pub mod deadline_store;
pub mod key;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{Activation, Countdown, CountdownPhase, TickOutcome};
pub use deadline_store::DeadlineStore;
pub use key::TimerKey;
pub use registry::{CountdownHandle, TimerRegistry};

/// Remaining seconds at which the one-time warning fires
pub const WARNING_THRESHOLD_SECS: u64 = 5 * 60;

/// Hooks the countdown calls into its host.
///
/// Both are invoked while the engine lock is held, so an implementation must not call
/// back into the registry or the handle of the countdown that invoked it.
pub trait TimerCallbacks: Send + Sync {
    /// Allotted time has run out (or had already run out on activation)
    fn on_time_up(&self);

    /// Remaining time just reached the warning threshold
    fn on_five_minute_warning(&self) {}

    /// A finished host is never given a new countdown. Checked by the registry under
    /// its lock, so it must not call into the registry either.
    fn is_finished(&self) -> bool {
        false
    }
}
