//! Manual calendar sync trigger.

use std::sync::atomic::Ordering;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use clubhouse_core::sync::run_sync;

use crate::routes::{AppError, ErrorResponse, auth::RequireAdmin};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/sync-calendar", post(trigger_sync))
}

async fn trigger_sync(_admin: RequireAdmin, State(state): State<AppState>) -> Response {
    // Only one sync at a time; a second trigger while one is running is
    // almost always a double-click.
    if state
        .sync_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("a calendar sync is already running")),
        )
            .into_response();
    }

    let result = run_sync(state.feed.as_ref(), state.events.as_ref(), Utc::now()).await;
    state.sync_running.store(false, Ordering::SeqCst);

    match result {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
