//! Main application state management

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::TimerState;
use crate::{
    dashboard::{build_dashboard, Dashboard, Viewer},
    error::AppError,
    section::{
        AttemptSnapshot, Completion, Page, QuestionView, SectionContent, SectionReport,
        SectionSession,
    },
    services::{DataService, Passage, Section, TestSummary},
    store::KeyValueStore,
    timer::{Activation, Clock, DeadlineStore, TimerCallbacks, TimerKey, TimerRegistry},
};

/// Everything a mounted section page renders
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub test_id: i64,
    pub timer_key: TimerKey,
    pub section: Section,
    pub passages: Vec<Passage>,
    pub questions: Vec<QuestionView>,
    pub pages: Vec<Page>,
    pub timer: TimerState,
    #[serde(flatten)]
    pub attempt: AttemptSnapshot,
}

/// Main application state: data service, timers and mounted sections
pub struct AppState {
    pub data: Arc<dyn DataService>,
    pub timers: TimerRegistry,
    pub clock: Arc<dyn Clock>,
    /// Lifetime of the five-minute banner
    pub banner_duration_ms: i64,
    sessions: Mutex<HashMap<TimerKey, Arc<SectionSession>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(
        data: Arc<dyn DataService>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        banner_duration_ms: i64,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            data,
            timers: TimerRegistry::new(DeadlineStore::new(store), Arc::clone(&clock)),
            clock,
            banner_duration_ms,
            sessions: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
            port,
            host,
        }
    }

    fn session(&self, key: &TimerKey) -> Result<Option<Arc<SectionSession>>, AppError> {
        self.sessions
            .lock()
            .map(|sessions| sessions.get(key).cloned())
            .map_err(|e| AppError::Internal(format!("Failed to lock sessions: {}", e)))
    }

    fn open_session(&self, test_id: i64, section_id: i64) -> Result<Arc<SectionSession>, AppError> {
        let key = TimerKey::new(test_id, section_id);
        self.session(&key)?.ok_or(AppError::NoAttempt(key))
    }

    pub fn tests(&self) -> Result<Vec<TestSummary>, AppError> {
        self.data.fetch_tests().map_err(AppError::fetch("tests"))
    }

    /// Mount a section: fetch it on first visit, then activate its countdown.
    ///
    /// Remounting an unfinished section keeps its answers; activation is a no-op while
    /// the countdown for the same key and duration is still running.
    pub fn mount_section(&self, test_id: i64, section_id: i64) -> Result<SectionView, AppError> {
        let key = TimerKey::new(test_id, section_id);

        let session = match self.session(&key)? {
            Some(session) => session,
            None => {
                let content = SectionContent::load(self.data.as_ref(), test_id, section_id)?;
                let fresh = Arc::new(SectionSession::new(
                    key.clone(),
                    content,
                    Arc::clone(&self.clock),
                    self.banner_duration_ms,
                ));
                let mut sessions = self
                    .sessions
                    .lock()
                    .map_err(|e| AppError::Internal(format!("Failed to lock sessions: {}", e)))?;
                Arc::clone(sessions.entry(key.clone()).or_insert(fresh))
            }
        };

        if !session.is_finished() {
            let callbacks: Arc<dyn TimerCallbacks> = session.clone();
            let activation = self
                .timers
                .activate(key.clone(), session.duration_minutes(), callbacks)
                .map_err(AppError::Internal)?;
            match activation {
                Activation::Untimed => info!("Mounted untimed section {}", key),
                Activation::AlreadyExpired => info!("Mounted {} after its time ran out", key),
                Activation::Finished => debug!("Mounted {} after it was submitted", key),
                Activation::Started { remaining_seconds }
                | Activation::Resumed { remaining_seconds } => {
                    info!("Mounted {} with {}s on the clock", key, remaining_seconds)
                }
            }
        }

        self.view(&session)
    }

    pub fn section_view(&self, test_id: i64, section_id: i64) -> Result<SectionView, AppError> {
        let session = self.open_session(test_id, section_id)?;
        self.view(&session)
    }

    fn view(&self, session: &SectionSession) -> Result<SectionView, AppError> {
        // Timer first: taking the engine lock while holding the attempt lock could
        // deadlock against a tick calling back into the session.
        let timer = TimerState::from_snapshot(self.timers.snapshot(session.key()));
        let attempt = session.snapshot()?;
        let content = session.content();

        Ok(SectionView {
            test_id: content.test_id,
            timer_key: session.key().clone(),
            section: content.section.clone(),
            passages: content.passages.clone(),
            questions: content.question_views(),
            pages: content.pages(),
            timer,
            attempt,
        })
    }

    pub fn answer(
        &self,
        test_id: i64,
        section_id: i64,
        question_id: i64,
        answer_choice_id: i64,
    ) -> Result<(), AppError> {
        self.open_session(test_id, section_id)?
            .answer(question_id, answer_choice_id)
    }

    /// Manual submission: grade, stop the countdown, forget its deadline.
    ///
    /// The attempt is closed before the cancel, so a mount racing this call either has
    /// its loop cancelled here or is refused one by the registry.
    pub fn submit(&self, test_id: i64, section_id: i64) -> Result<SectionReport, AppError> {
        let session = self.open_session(test_id, section_id)?;
        let key = session.key();

        let report = session.finish(Completion::Submitted)?;
        self.timers.cancel(key);
        self.timers.deadline_store().clear(key);
        Ok(report)
    }

    pub fn report(&self, test_id: i64, section_id: i64) -> Result<SectionReport, AppError> {
        let session = self.open_session(test_id, section_id)?;
        session
            .report()
            .ok_or_else(|| AppError::NotSubmitted(session.key().clone()))
    }

    /// Unmount: stop ticking but keep the stored deadline so a later visit resumes
    pub fn unmount_section(&self, test_id: i64, section_id: i64) -> Result<bool, AppError> {
        let key = TimerKey::new(test_id, section_id);
        let cancelled = self.timers.cancel(&key);
        let removed = self
            .sessions
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to lock sessions: {}", e)))?
            .remove(&key)
            .is_some();
        if removed {
            info!("Unmounted {} (countdown stopped: {})", key, cancelled);
        }
        Ok(removed)
    }

    pub fn dashboard(&self, token: Option<&str>) -> Result<(Viewer, Dashboard), AppError> {
        let viewer = Viewer::resolve(self.data.as_ref(), token);
        let dashboard = build_dashboard(self.data.as_ref(), &viewer)?;
        Ok((viewer, dashboard))
    }

    pub fn mounted_sections(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Stop every countdown; stored deadlines are kept for the next run
    pub fn shutdown(&self) {
        self.timers.shutdown();
        match self.sessions.lock() {
            Ok(mut sessions) => sessions.clear(),
            Err(e) => warn!("Failed to lock sessions during shutdown: {}", e),
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mounted_sections", &self.mounted_sections())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::JsonCatalog,
        store::MemoryStore,
        timer::{CountdownPhase, SystemClock},
    };
    use std::time::Duration;

    const CATALOG: &str = r#"{
        "tests": [{"id": 1, "title": "Practice Test 1", "math_section_id": 2, "science_section_id": 3}],
        "sections": [
            {"id": 2, "type": "Math", "time_minutes": 1},
            {"id": 3, "type": "Science", "time_minutes": 0},
            {"id": 4, "type": "Math", "time_minutes": -5}
        ],
        "passages": [{"id": 30, "section_id": 3, "title": "Data", "passage_text": "...", "order": 1}],
        "questions": [
            {"id": 10, "section_id": 2, "text": "a", "correct_answer_choice_id": 100,
             "answer_choices": [{"id": 100, "text": "yes", "order": 1}, {"id": 101, "text": "no", "order": 2}]},
            {"id": 11, "section_id": 2, "text": "b", "correct_answer_choice_id": 111,
             "answer_choices": [{"id": 110, "text": "yes", "order": 1}, {"id": 111, "text": "no", "order": 2}]},
            {"id": 31, "section_id": 3, "text": "c", "passage_id": 30, "correct_answer_choice_id": 310,
             "answer_choices": [{"id": 310, "text": "up", "order": 1}]},
            {"id": 41, "section_id": 4, "text": "d", "correct_answer_choice_id": 410,
             "answer_choices": [{"id": 410, "text": "ok", "order": 1}]}
        ]
    }"#;

    fn app() -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            Arc::new(JsonCatalog::from_json(CATALOG).unwrap()),
            store.clone(),
            Arc::new(SystemClock),
            3_000,
            0,
            "127.0.0.1".into(),
        );
        (store, state)
    }

    #[tokio::test(start_paused = true)]
    async fn timed_section_auto_submits() {
        let (store, state) = app();
        let view = state.mount_section(1, 2).unwrap();
        assert_eq!(view.timer.remaining_seconds, Some(60));
        assert_eq!(view.timer.display.as_deref(), Some("01:00"));
        assert!(store.get("timerEndTime_test_1_section_2").is_some());

        state.answer(1, 2, 10, 100).unwrap();
        tokio::time::sleep(Duration::from_millis(61_500)).await;

        let view = state.section_view(1, 2).unwrap();
        assert!(!view.timer.active);
        assert_eq!(view.attempt.completion, Some(Completion::TimeUp));
        assert_eq!(state.report(1, 2).unwrap().correct, 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_clears_store_and_stops_timer() {
        let (store, state) = app();
        state.mount_section(1, 2).unwrap();
        state.answer(1, 2, 11, 111).unwrap();
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let report = state.submit(1, 2).unwrap();
        assert_eq!(report.to_string(), "1/2");
        assert!(store.is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(store.is_empty());
        assert_eq!(
            state.section_view(1, 2).unwrap().attempt.completion,
            Some(Completion::Submitted)
        );
        assert!(matches!(state.answer(1, 2, 10, 100), Err(AppError::AlreadySubmitted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn remount_keeps_single_countdown() {
        let (_, state) = app();
        state.mount_section(1, 2).unwrap();
        state.answer(1, 2, 10, 101).unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let view = state.mount_section(1, 2).unwrap();
        assert_eq!(view.timer.remaining_seconds, Some(50));
        assert_eq!(view.attempt.answers.get(&10), Some(&101));
        assert_eq!(state.timers.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_keeps_deadline_for_resume() {
        let (store, state) = app();
        state.mount_section(1, 2).unwrap();
        tokio::time::sleep(Duration::from_millis(20_500)).await;

        assert!(state.unmount_section(1, 2).unwrap());
        assert!(store.get("timerEndTime_test_1_section_2").is_some());
        assert_eq!(
            state.timers.snapshot(&TimerKey::new(1, 2)),
            None::<(CountdownPhase, u64)>
        );
        assert!(matches!(state.section_view(1, 2), Err(AppError::NoAttempt(_))));

        let view = state.mount_section(1, 2).unwrap();
        let remaining = view.timer.remaining_seconds.unwrap();
        assert!(remaining <= 40 && remaining >= 39, "remaining {}", remaining);
    }

    #[tokio::test]
    async fn untimed_section_never_writes_store() {
        let (store, state) = app();
        let view = state.mount_section(1, 3).unwrap();
        assert!(!view.timer.active);
        assert_eq!(view.pages.len(), 1);
        assert!(store.is_empty());
        assert!(matches!(state.report(1, 3), Err(AppError::NotSubmitted(_))));
    }

    #[tokio::test]
    async fn missing_section_is_a_fetch_error() {
        let (_, state) = app();
        let err = state.mount_section(1, 99).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load section: section 99 not found");
        assert_eq!(state.mounted_sections(), 0);
    }

    #[tokio::test]
    async fn negative_duration_is_untimed() {
        let (store, state) = app();
        let view = state.mount_section(1, 4).unwrap();
        assert!(!view.timer.active);
        assert_eq!(state.timers.active_count(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn activation_landing_after_submit_is_refused() {
        let (store, state) = app();
        state.mount_section(1, 2).unwrap();
        let key = TimerKey::new(1, 2);
        let session = state.session(&key).unwrap().unwrap();

        state.submit(1, 2).unwrap();
        assert!(store.is_empty());

        // Second half of a mount that checked the attempt before the submit landed
        let callbacks: Arc<dyn TimerCallbacks> = session.clone();
        let activation = state
            .timers
            .activate(key.clone(), session.duration_minutes(), callbacks)
            .unwrap();
        assert_eq!(activation, Activation::Finished);
        assert_eq!(state.timers.active_count(), 0);

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(store.is_empty());
        assert_eq!(
            state.section_view(1, 2).unwrap().attempt.completion,
            Some(Completion::Submitted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remount_after_submit_starts_nothing() {
        let (store, state) = app();
        state.mount_section(1, 2).unwrap();
        state.submit(1, 2).unwrap();

        let view = state.mount_section(1, 2).unwrap();
        assert!(!view.timer.active);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.is_empty());
    }
}
