pub mod attendance;
pub mod auth;
pub mod events;
pub mod gallery;
pub mod members;
pub mod notices;
pub mod sync;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use clubhouse_core::error::ClubError;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(sync::router())
        .merge(events::router())
        .merge(attendance::router())
        .merge(members::router())
        .merge(notices::router())
        .merge(gallery::router())
        .with_state(state)
}

/// Standard API error payload.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            details: None,
        }
    }
}

/// Convert core errors to HTTP responses.
pub struct AppError(ClubError);

impl From<ClubError> for AppError {
    fn from(err: ClubError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self.0 {
            ClubError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, "validation error", Some(detail))
            }
            ClubError::EventNotFound(id) => (StatusCode::NOT_FOUND, "event not found", Some(id)),
            ClubError::MemberNotFound(id) => (StatusCode::NOT_FOUND, "member not found", Some(id)),
            ClubError::NoticeNotFound(id) => (StatusCode::NOT_FOUND, "notice not found", Some(id)),
            ClubError::AlbumNotFound(id) => (StatusCode::NOT_FOUND, "album not found", Some(id)),
            ClubError::Feed(detail) => (StatusCode::BAD_GATEWAY, "calendar feed error", Some(detail)),
            ClubError::Push(detail) => (StatusCode::BAD_GATEWAY, "push gateway error", Some(detail)),
            ClubError::Config(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service not configured",
                Some(detail),
            ),
            ClubError::Store(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "backend error",
                Some(detail),
            ),
            ClubError::Serialization(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization error",
                Some(detail),
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });
        (status, body).into_response()
    }
}
