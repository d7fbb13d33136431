//! Countdown tick background task

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::timer::{Countdown, TickOutcome};

/// Tick `engine` once per second until it expires or is cancelled.
///
/// The engine lock is held for the whole tick, which is what makes cancellation
/// synchronous for the caller of `CountdownHandle::cancel`.
pub async fn countdown_task(engine: Arc<Mutex<Countdown>>) {
    let key = match engine.lock() {
        Ok(engine) => engine.key().clone(),
        Err(e) => {
            error!("Countdown lock poisoned before first tick: {}", e);
            return;
        }
    };
    debug!("Starting tick loop for {}", key);

    let period = Duration::from_secs(1);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let outcome = match engine.lock() {
            Ok(mut engine) => engine.tick(),
            Err(e) => {
                error!("Countdown lock poisoned for {}: {}", key, e);
                break;
            }
        };

        match outcome {
            TickOutcome::Ticked { .. } => continue,
            TickOutcome::Expired => {
                info!("Tick loop for {} finished: time is up", key);
                break;
            }
            TickOutcome::Idle => {
                debug!("Tick loop for {} stopped: countdown no longer running", key);
                break;
            }
        }
    }
}
