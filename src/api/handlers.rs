//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
};
use tracing::{debug, info};

use super::responses::{
    AnswerRequest, ApiResponse, DashboardResponse, HealthResponse, ReportResponse,
};
use crate::{
    error::AppError,
    section::parse_route_params,
    services::TestSummary,
    state::{AppState, SectionView},
    timer::TimerKey,
};

/// Handle GET /tests - List tests with their sections
pub async fn tests_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TestSummary>>, AppError> {
    Ok(Json(state.tests()?))
}

/// Handle GET /test/:test_id/section/:section_id - Mount the section and start its timer
pub async fn section_handler(
    State(state): State<Arc<AppState>>,
    Path((test_id, section_id)): Path<(String, String)>,
) -> Result<Json<SectionView>, AppError> {
    let (test_id, section_id) = parse_route_params(&test_id, &section_id)?;
    Ok(Json(state.mount_section(test_id, section_id)?))
}

/// Handle POST /test/:test_id/section/:section_id/answer - Record one answer
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Path((test_id, section_id)): Path<(String, String)>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    let (test_id, section_id) = parse_route_params(&test_id, &section_id)?;
    state.answer(test_id, section_id, request.question_id, request.answer_choice_id)?;
    debug!(
        "Recorded answer {} for question {} in {}",
        request.answer_choice_id,
        request.question_id,
        TimerKey::new(test_id, section_id)
    );
    Ok(Json(ApiResponse::ok("Answer recorded".to_string())))
}

/// Handle POST /test/:test_id/section/:section_id/submit - Grade the section
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path((test_id, section_id)): Path<(String, String)>,
) -> Result<Json<ReportResponse>, AppError> {
    let (test_id, section_id) = parse_route_params(&test_id, &section_id)?;
    let report = state.submit(test_id, section_id)?;
    info!("Section submitted - score {}", report);
    Ok(Json(ReportResponse::new(
        TimerKey::new(test_id, section_id),
        report,
    )))
}

/// Handle GET /test/:test_id/section/:section_id/report - Fetch the graded report
pub async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path((test_id, section_id)): Path<(String, String)>,
) -> Result<Json<ReportResponse>, AppError> {
    let (test_id, section_id) = parse_route_params(&test_id, &section_id)?;
    let report = state.report(test_id, section_id)?;
    Ok(Json(ReportResponse::new(
        TimerKey::new(test_id, section_id),
        report,
    )))
}

/// Handle DELETE /test/:test_id/section/:section_id - Leave the section page
pub async fn unmount_handler(
    State(state): State<Arc<AppState>>,
    Path((test_id, section_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse>, AppError> {
    let (test_id, section_id) = parse_route_params(&test_id, &section_id)?;
    let key = TimerKey::new(test_id, section_id);
    if !state.unmount_section(test_id, section_id)? {
        return Err(AppError::NoAttempt(key));
    }
    Ok(Json(ApiResponse::ok(format!("Section {} closed", key))))
}

/// Handle GET /dashboard - Role-specific dashboard
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let token = bearer_token(&headers);
    let (viewer, dashboard) = state.dashboard(token)?;
    Ok(Json(DashboardResponse {
        role: viewer.role_name().to_string(),
        dashboard,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.get_uptime(),
        state.timers.active_count(),
    ))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
