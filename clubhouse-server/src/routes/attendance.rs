//! Attendance answers.
//!
//! Members answer for themselves via POST; admins answer on a member's
//! behalf via PUT and revoke an answer entirely via DELETE. Every response
//! echoes the event's fresh counts so clients never recompute them.

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clubhouse_core::attendance::{AttendanceCounts, AttendanceLedger, AttendanceStatus};
use clubhouse_core::error::ClubError;

use crate::routes::{
    AppError,
    auth::{CurrentUser, RequireAdmin},
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/attendance",
        post(answer).put(answer_for_member).delete(revoke),
    )
}

#[derive(Deserialize)]
struct SelfAnswer {
    event_id: Uuid,
    status: AttendanceStatus,
}

#[derive(Deserialize)]
struct ProxyAnswer {
    event_id: Uuid,
    user_id: Uuid,
    status: AttendanceStatus,
}

#[derive(Serialize)]
struct AnswerOutcome {
    /// False when the answer already matched and no write happened.
    written: bool,
    #[serde(flatten)]
    counts: AttendanceCounts,
    responded: usize,
}

async fn record_answer(
    state: &AppState,
    event_id: Uuid,
    user_id: Uuid,
    status: AttendanceStatus,
) -> Result<Json<AnswerOutcome>, AppError> {
    state
        .events
        .event(event_id)
        .await?
        .ok_or_else(|| ClubError::EventNotFound(event_id.to_string()))?;

    let ledger = AttendanceLedger::new(state.attendance.as_ref());
    let written = ledger
        .set_status(event_id, user_id, status, Utc::now())
        .await?;
    let counts = ledger.counts_for(event_id).await?;
    Ok(Json(AnswerOutcome {
        written,
        counts,
        responded: counts.responded(),
    }))
}

async fn answer(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SelfAnswer>,
) -> Result<Json<AnswerOutcome>, AppError> {
    record_answer(&state, body.event_id, user.0, body.status).await
}

async fn answer_for_member(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<ProxyAnswer>,
) -> Result<Json<AnswerOutcome>, AppError> {
    state
        .profiles
        .member(body.user_id)
        .await?
        .ok_or_else(|| ClubError::MemberNotFound(body.user_id.to_string()))?;
    record_answer(&state, body.event_id, body.user_id, body.status).await
}

#[derive(Deserialize)]
struct RevokeAnswer {
    event_id: Uuid,
    user_id: Uuid,
}

async fn revoke(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<RevokeAnswer>,
) -> Result<Json<AnswerOutcome>, AppError> {
    state
        .events
        .event(body.event_id)
        .await?
        .ok_or_else(|| ClubError::EventNotFound(body.event_id.to_string()))?;

    let ledger = AttendanceLedger::new(state.attendance.as_ref());
    ledger.clear_status(body.event_id, body.user_id).await?;
    let counts = ledger.counts_for(body.event_id).await?;
    Ok(Json(AnswerOutcome {
        written: true,
        counts,
        responded: counts.responded(),
    }))
}
