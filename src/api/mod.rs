//! HTTP API module
//!
//! Page routes of the practice app, one handler per page action.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tests", get(tests_handler))
        .route(
            "/test/:test_id/section/:section_id",
            get(section_handler).delete(unmount_handler),
        )
        .route("/test/:test_id/section/:section_id/answer", post(answer_handler))
        .route("/test/:test_id/section/:section_id/submit", post(submit_handler))
        .route("/test/:test_id/section/:section_id/report", get(report_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
