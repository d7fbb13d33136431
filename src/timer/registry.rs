//! Live countdowns keyed by section

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    Activation, Clock, Countdown, CountdownPhase, DeadlineStore, TimerCallbacks, TimerKey,
};
use crate::tasks::countdown_task;

/// Owner of one ticking countdown.
///
/// `cancel` takes the engine lock, so it waits out an in-flight tick and nothing is
/// written or invoked once it returns. Dropping the handle cancels it.
#[derive(Debug)]
pub struct CountdownHandle {
    engine: Arc<Mutex<Countdown>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownHandle {
    /// Start ticking an already activated engine. Requires a tokio runtime.
    pub fn spawn(engine: Arc<Mutex<Countdown>>) -> Self {
        let task = tokio::spawn(countdown_task(Arc::clone(&engine)));
        Self {
            engine,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn cancel(&self) {
        match self.engine.lock() {
            Ok(mut engine) => {
                engine.cancel();
            }
            Err(e) => warn!("Countdown lock poisoned during cancel: {}", e),
        }
        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }

    /// Phase and remaining seconds
    pub fn snapshot(&self) -> Option<(CountdownPhase, u64)> {
        self.engine
            .lock()
            .ok()
            .map(|e| (e.phase(), e.remaining_seconds()))
    }

    fn duration_minutes(&self) -> Option<i64> {
        self.engine.lock().ok().map(|e| e.duration_minutes())
    }

    fn is_running(&self) -> bool {
        matches!(self.snapshot(), Some((CountdownPhase::Running, _)))
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// At most one tick loop per `TimerKey`
pub struct TimerRegistry {
    store: DeadlineStore,
    clock: Arc<dyn Clock>,
    handles: Mutex<HashMap<TimerKey, CountdownHandle>>,
}

impl TimerRegistry {
    pub fn new(store: DeadlineStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn deadline_store(&self) -> &DeadlineStore {
        &self.store
    }

    /// Activate the countdown for `key`.
    ///
    /// A live countdown with the same duration is left alone. Anything else under the
    /// key is torn down before the new engine is activated. The registry lock is held
    /// from the finished check through the insert, so a host that finishes and then
    /// cancels its key can never be handed a loop afterwards.
    pub fn activate(
        &self,
        key: TimerKey,
        duration_minutes: i64,
        callbacks: Arc<dyn TimerCallbacks>,
    ) -> Result<Activation, String> {
        let mut handles = self
            .handles
            .lock()
            .map_err(|e| format!("Failed to lock timer registry: {}", e))?;

        let before = handles.len();
        handles.retain(|k, h| k == &key || h.is_running());
        if handles.len() < before {
            debug!("Pruned {} finished countdowns", before - handles.len());
        }

        let finished = callbacks.is_finished();
        if let Some(existing) = handles.get(&key).filter(|_| !finished) {
            if existing.duration_minutes() == Some(duration_minutes) {
                if let Some((CountdownPhase::Running, remaining)) = existing.snapshot() {
                    debug!("Countdown for {} already running, keeping it", key);
                    return Ok(Activation::Resumed {
                        remaining_seconds: remaining,
                    });
                }
            }
        }

        if let Some(previous) = handles.remove(&key) {
            info!("Tearing down previous countdown for {}", key);
            previous.cancel();
        }

        if finished {
            debug!("Host for {} already finished, no countdown started", key);
            return Ok(Activation::Finished);
        }

        let mut countdown = Countdown::new(
            key.clone(),
            duration_minutes,
            self.store.clone(),
            Arc::clone(&self.clock),
            callbacks,
        );
        let activation = countdown.activate();

        if activation.is_running() {
            handles.insert(key, CountdownHandle::spawn(Arc::new(Mutex::new(countdown))));
        }

        Ok(activation)
    }

    /// Stop the loop for `key`, leaving the stored deadline in place
    pub fn cancel(&self, key: &TimerKey) -> bool {
        let handle = match self.handles.lock() {
            Ok(mut handles) => handles.remove(key),
            Err(e) => {
                warn!("Failed to lock timer registry: {}", e);
                None
            }
        };
        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, key: &TimerKey) -> Option<(CountdownPhase, u64)> {
        self.handles
            .lock()
            .ok()
            .and_then(|handles| handles.get(key).and_then(|h| h.snapshot()))
    }

    pub fn active_count(&self) -> usize {
        self.handles
            .lock()
            .map(|handles| {
                handles
                    .values()
                    .filter(|h| h.is_running())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Cancel every loop. Stored deadlines survive for the next run.
    pub fn shutdown(&self) {
        let drained: Vec<(TimerKey, CountdownHandle)> = match self.handles.lock() {
            Ok(mut handles) => handles.drain().collect(),
            Err(e) => {
                warn!("Failed to lock timer registry during shutdown: {}", e);
                return;
            }
        };
        for (key, handle) in drained {
            debug!("Stopping countdown for {}", key);
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{KeyValueStore, MemoryStore},
        timer::SystemClock,
    };
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Default)]
    struct Counter {
        time_up: AtomicUsize,
        finished: AtomicBool,
    }

    impl TimerCallbacks for Counter {
        fn on_time_up(&self) {
            self.time_up.fetch_add(1, Ordering::SeqCst);
        }

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    fn registry() -> (Arc<MemoryStore>, TimerRegistry) {
        let backing = Arc::new(MemoryStore::new());
        let registry = TimerRegistry::new(
            DeadlineStore::new(backing.clone()),
            Arc::new(SystemClock),
        );
        (backing, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_duration() {
        let (backing, registry) = registry();
        let counter = Arc::new(Counter::default());
        let key = TimerKey::new(1, 1);

        let activation = registry.activate(key.clone(), 1, counter.clone()).unwrap();
        assert_eq!(
            activation,
            Activation::Started {
                remaining_seconds: 60
            }
        );

        tokio::time::sleep(Duration::from_millis(55_500)).await;
        assert_eq!(registry.snapshot(&key), Some((CountdownPhase::Running, 5)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.time_up.load(Ordering::SeqCst), 1);
        assert_eq!(registry.snapshot(&key), Some((CountdownPhase::Expired, 0)));
        assert!(backing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn same_duration_keeps_single_loop() {
        let (_, registry) = registry();
        let counter = Arc::new(Counter::default());
        let key = TimerKey::new(2, 3);

        registry.activate(key.clone(), 2, counter.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let again = registry.activate(key.clone(), 2, counter.clone()).unwrap();
        assert_eq!(
            again,
            Activation::Resumed {
                remaining_seconds: 110
            }
        );
        assert_eq!(registry.active_count(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(registry.snapshot(&key), Some((CountdownPhase::Running, 105)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_final() {
        let (backing, registry) = registry();
        let counter = Arc::new(Counter::default());
        let key = TimerKey::new(3, 4);

        registry.activate(key.clone(), 1, counter.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert!(registry.cancel(&key));
        assert!(!registry.cancel(&key));

        backing.remove("timerEndTime_test_3_section_4");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(counter.time_up.load(Ordering::SeqCst), 0);
        assert_eq!(backing.get("timerEndTime_test_3_section_4"), None);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_keeps_deadlines() {
        let (backing, registry) = registry();
        let counter = Arc::new(Counter::default());

        registry.activate(TimerKey::new(5, 1), 10, counter.clone()).unwrap();
        registry.activate(TimerKey::new(5, 2), 10, counter.clone()).unwrap();
        assert_eq!(registry.active_count(), 2);

        registry.shutdown();
        assert_eq!(registry.active_count(), 0);
        assert!(backing.get("timerEndTime_test_5_section_1").is_some());
        assert!(backing.get("timerEndTime_test_5_section_2").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_host_gets_no_loop() {
        let (backing, registry) = registry();
        let counter = Arc::new(Counter::default());
        counter.finished.store(true, Ordering::SeqCst);
        let key = TimerKey::new(6, 1);

        let activation = registry.activate(key.clone(), 1, counter.clone()).unwrap();
        assert_eq!(activation, Activation::Finished);
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.snapshot(&key), None);
        assert!(backing.is_empty());

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(counter.time_up.load(Ordering::SeqCst), 0);
        assert!(backing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_tears_down_a_live_loop_on_reactivation() {
        let (backing, registry) = registry();
        let counter = Arc::new(Counter::default());
        let key = TimerKey::new(6, 2);

        registry.activate(key.clone(), 1, counter.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        counter.finished.store(true, Ordering::SeqCst);
        registry.activate(key.clone(), 2, counter.clone()).unwrap();
        assert_eq!(registry.snapshot(&key), None);

        backing.remove("timerEndTime_test_6_section_2");
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(backing.get("timerEndTime_test_6_section_2"), None);
        assert_eq!(counter.time_up.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_loops_are_pruned() {
        let (_, registry) = registry();
        let counter = Arc::new(Counter::default());
        let short = TimerKey::new(7, 1);

        registry.activate(short.clone(), 1, counter.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(61_500)).await;
        assert_eq!(registry.snapshot(&short), Some((CountdownPhase::Expired, 0)));

        registry.activate(TimerKey::new(7, 2), 10, counter.clone()).unwrap();
        assert_eq!(registry.snapshot(&short), None);
        assert_eq!(registry.active_count(), 1);
    }
}
