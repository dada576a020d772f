//! Notices, with the push side effect on creation.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use clubhouse_core::error::ClubError;
use clubhouse_core::notice::{Notice, NoticeDraft};
use clubhouse_core::push::PushMessage;

use crate::routes::{
    AppError,
    auth::{CurrentUser, RequireAdmin},
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notices", get(visible_notices).post(create_notice))
        .route("/notices/all", get(all_notices))
        .route("/notices/{id}", put(update_notice).delete(remove_notice))
}

async fn visible_notices(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Notice>>, AppError> {
    let now = Utc::now();
    let notices = state
        .notices
        .notices()
        .await?
        .into_iter()
        .filter(|n| n.is_visible_to(user.0, now))
        .collect();
    Ok(Json(notices))
}

async fn all_notices(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notice>>, AppError> {
    Ok(Json(state.notices.notices().await?))
}

fn validate(draft: &NoticeDraft) -> Result<(), AppError> {
    if draft.title.trim().is_empty() || draft.content.trim().is_empty() {
        return Err(
            ClubError::Validation("notice title and content must not be empty".to_string()).into(),
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct NoticeCreated {
    notice: Notice,
    /// Devices the push reached; 0 when no gateway is configured or the
    /// push failed.
    devices_notified: usize,
}

async fn create_notice(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<NoticeDraft>,
) -> Result<(StatusCode, Json<NoticeCreated>), AppError> {
    validate(&draft)?;
    let notice = state.notices.create_notice(&draft).await?;

    // The notice is stored either way; a push failure only loses the ping.
    let message = PushMessage::for_notice(&notice);
    let devices_notified = match state.push.dispatch(&message).await {
        Ok(count) => {
            if count > 0 {
                info!(count, notice = %notice.id, "push delivered");
            }
            count
        }
        Err(err) => {
            warn!(error = %err, notice = %notice.id, "push delivery failed");
            0
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(NoticeCreated {
            notice,
            devices_notified,
        }),
    ))
}

async fn update_notice(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<NoticeDraft>,
) -> Result<Json<Notice>, AppError> {
    validate(&draft)?;
    let notice = state.notices.update_notice(id, &draft).await?;
    Ok(Json(notice))
}

async fn remove_notice(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.notices.delete_notice(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
