//! Identity extractors.
//!
//! Authentication itself is delegated: the auth proxy in front of this
//! service verifies the session and forwards the member id in `x-user-id`.
//! Admin routes additionally require the shared token from config in
//! `x-admin-token`. Nothing here stores or verifies credentials.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use uuid::Uuid;

use crate::routes::ErrorResponse;
use crate::state::AppState;

pub type AuthRejection = (StatusCode, Json<ErrorResponse>);

fn unauthorized(message: &str) -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(message)),
    )
}

/// The member making the request, from the `x-user-id` header.
pub struct CurrentUser(pub Uuid);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(CurrentUser)
            .ok_or_else(|| unauthorized("missing or invalid x-user-id header"))
    }
}

/// Guard for office/admin routes.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(unauthorized("admin routes are disabled"));
        };
        let presented = parts
            .headers
            .get("x-admin-token")
            .and_then(|v| v.to_str().ok());
        if presented == Some(expected) {
            Ok(RequireAdmin)
        } else {
            Err(unauthorized("admin token missing or incorrect"))
        }
    }
}
