//! Section attempt: answers, warning banner and the final report

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{scoring::score_section, SectionContent, SectionReport};
use crate::{
    error::AppError,
    timer::{Clock, TimerCallbacks, TimerKey},
};

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Submitted,
    TimeUp,
}

#[derive(Debug, Default)]
struct Attempt {
    answers: HashMap<i64, i64>,
    banner_until: Option<i64>,
    report: Option<SectionReport>,
    completion: Option<Completion>,
}

/// Point-in-time copy of an attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSnapshot {
    pub answers: HashMap<i64, i64>,
    pub show_warning_banner: bool,
    pub completion: Option<Completion>,
    pub report: Option<SectionReport>,
}

/// Host of one mounted section.
///
/// Registered with the countdown as its callbacks. The attempt lock is never held
/// while calling into the timer registry, since a tick holds the engine lock while
/// it calls back in here.
pub struct SectionSession {
    key: TimerKey,
    content: SectionContent,
    clock: Arc<dyn Clock>,
    banner_duration_ms: i64,
    attempt: Mutex<Attempt>,
}

impl SectionSession {
    pub fn new(
        key: TimerKey,
        content: SectionContent,
        clock: Arc<dyn Clock>,
        banner_duration_ms: i64,
    ) -> Self {
        Self {
            key,
            content,
            clock,
            banner_duration_ms,
            attempt: Mutex::new(Attempt::default()),
        }
    }

    pub fn key(&self) -> &TimerKey {
        &self.key
    }

    pub fn content(&self) -> &SectionContent {
        &self.content
    }

    pub fn duration_minutes(&self) -> i64 {
        self.content.section.time_minutes
    }

    fn lock(&self) -> Result<MutexGuard<'_, Attempt>, AppError> {
        self.attempt
            .lock()
            .map_err(|e| AppError::Internal(format!("attempt lock for {}: {}", self.key, e)))
    }

    /// Record an answer, replacing any earlier pick for the question
    pub fn answer(&self, question_id: i64, answer_choice_id: i64) -> Result<(), AppError> {
        let question = self
            .content
            .question(question_id)
            .ok_or(AppError::UnknownQuestion(question_id))?;
        if question.choice(answer_choice_id).is_none() {
            return Err(AppError::UnknownAnswerChoice {
                question_id,
                answer_choice_id,
            });
        }

        let mut attempt = self.lock()?;
        if attempt.report.is_some() {
            return Err(AppError::AlreadySubmitted(self.key.clone()));
        }
        attempt.answers.insert(question_id, answer_choice_id);
        Ok(())
    }

    /// Grade the attempt. Only the first call scores; later calls return that report.
    pub fn finish(&self, completion: Completion) -> Result<SectionReport, AppError> {
        let mut attempt = self.lock()?;
        if let Some(report) = &attempt.report {
            return Ok(report.clone());
        }

        let report = score_section(&self.content.questions, &attempt.answers);
        info!(
            "{} section {} finished ({:?}): score {}",
            self.content.kind, self.key, completion, report
        );
        attempt.report = Some(report.clone());
        attempt.completion = Some(completion);
        attempt.banner_until = None;
        Ok(report)
    }

    pub fn report(&self) -> Option<SectionReport> {
        self.lock().ok().and_then(|a| a.report.clone())
    }

    pub fn snapshot(&self) -> Result<AttemptSnapshot, AppError> {
        let now = self.clock.now_millis();
        let attempt = self.lock()?;
        Ok(AttemptSnapshot {
            answers: attempt.answers.clone(),
            show_warning_banner: attempt.banner_until.is_some_and(|until| now < until),
            completion: attempt.completion,
            report: attempt.report.clone(),
        })
    }
}

impl TimerCallbacks for SectionSession {
    fn on_time_up(&self) {
        if let Err(e) = self.finish(Completion::TimeUp) {
            error!("Failed to auto-submit {}: {}", self.key, e);
        }
    }

    fn on_five_minute_warning(&self) {
        let until = self.clock.now_millis() + self.banner_duration_ms;
        match self.attempt.lock() {
            Ok(mut attempt) => attempt.banner_until = Some(until),
            Err(e) => warn!("Failed to raise warning banner for {}: {}", self.key, e),
        }
    }

    fn is_finished(&self) -> bool {
        self.lock().map(|a| a.report.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for SectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionSession")
            .field("key", &self.key)
            .field("kind", &self.content.kind)
            .finish_non_exhaustive()
    }
}
