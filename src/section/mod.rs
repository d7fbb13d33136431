//! Section module
//!
//! One canonical section page for every subject: what to fetch, how to lay it out,
//! how to grade it, and the attempt that hosts the countdown.

pub mod content;
pub mod kind;
pub mod scoring;
pub mod session;

pub use content::{Page, QuestionView, SectionContent};
pub use kind::SectionKind;
pub use scoring::{score_section, AnswerReportItem, SectionReport};
pub use session::{AttemptSnapshot, Completion, SectionSession};

use crate::error::AppError;

/// Parse `test_id` and `section_id` path segments.
///
/// Empty or non-numeric segments are treated the same as missing ones.
pub fn parse_route_params(test_id: &str, section_id: &str) -> Result<(i64, i64), AppError> {
    let parse = |raw: &str| raw.trim().parse::<i64>().ok();
    match (parse(test_id), parse(section_id)) {
        (Some(test_id), Some(section_id)) => Ok((test_id, section_id)),
        _ => Err(AppError::MissingRouteParams),
    }
}
