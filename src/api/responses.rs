//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{dashboard::Dashboard, section::SectionReport, timer::TimerKey};

/// Body of every error response: one page-level message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Body for answer and unmount acknowledgements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn ok(message: String) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question_id: i64,
    pub answer_choice_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub timer_key: TimerKey,
    pub score: String,
    pub report: SectionReport,
}

impl ReportResponse {
    pub fn new(timer_key: TimerKey, report: SectionReport) -> Self {
        Self {
            timer_key,
            score: report.to_string(),
            report,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub role: String,
    pub dashboard: Dashboard,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub active_timers: usize,
}

impl HealthResponse {
    pub fn ok(uptime: String, active_timers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            active_timers,
        }
    }
}
