//! Application error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{api::responses::ErrorResponse, services::FetchError, timer::TimerKey};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Test ID or Section ID is missing from the URL.")]
    MissingRouteParams,

    #[error("Failed to load {page}: {source}")]
    Fetch {
        page: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("Question {0} is not part of this section")]
    UnknownQuestion(i64),

    #[error("Answer choice {answer_choice_id} does not belong to question {question_id}")]
    UnknownAnswerChoice {
        question_id: i64,
        answer_choice_id: i64,
    },

    #[error("Section {0} has already been submitted")]
    AlreadySubmitted(TimerKey),

    #[error("No open attempt for {0}")]
    NoAttempt(TimerKey),

    #[error("Section {0} has not been submitted yet")]
    NotSubmitted(TimerKey),

    #[error("Please log in to view your dashboard.")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Adapter for `map_err` on data service calls made while loading `page`
    pub fn fetch(page: &'static str) -> impl FnOnce(FetchError) -> Self {
        move |source| Self::Fetch { page, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRouteParams
            | Self::UnknownQuestion(_)
            | Self::UnknownAnswerChoice { .. } => StatusCode::BAD_REQUEST,
            Self::Fetch {
                source: FetchError::NotFound { .. },
                ..
            }
            | Self::NoAttempt(_) => StatusCode::NOT_FOUND,
            Self::Fetch {
                source: FetchError::Backend(_),
                ..
            } => StatusCode::BAD_GATEWAY,
            Self::AlreadySubmitted(_) | Self::NotSubmitted(_) => StatusCode::CONFLICT,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::MissingRouteParams.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::fetch("section")(FetchError::Backend("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::fetch("section")(FetchError::NotFound {
                what: "section",
                id: "9".into()
            })
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AlreadySubmitted(TimerKey::new(1, 1)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotSubmitted(TimerKey::new(1, 1)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NoAttempt(TimerKey::new(1, 1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn fetch_message_is_page_level() {
        let err = AppError::fetch("section")(FetchError::Backend("connection refused".into()));
        assert_eq!(err.to_string(), "Failed to load section: connection refused");

        let err = AppError::fetch("tests")(FetchError::Backend("timeout".into()));
        assert_eq!(err.to_string(), "Failed to load tests: timeout");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = AppError::Internal("poisoned lock".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
