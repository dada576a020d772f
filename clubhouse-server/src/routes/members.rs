//! Member directory and admin roster management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clubhouse_core::error::ClubError;
use clubhouse_core::member::{ClubOffice, Member, directory_order};

use crate::routes::{
    AppError,
    auth::{CurrentUser, RequireAdmin},
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(directory).post(create_member))
        .route(
            "/members/{id}",
            get(member_detail).put(update_member).delete(remove_member),
        )
        .route("/members/{id}/admin", put(set_admin_flag))
        .route("/members/{id}/device-token", put(register_device_token))
}

/// Directory row; deliberately omits device tokens and admin flags.
#[derive(Serialize)]
struct DirectoryEntry {
    id: Uuid,
    full_name: String,
    member_no: Option<String>,
    office: Option<ClubOffice>,
    cabinet_title: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    joined_on: Option<NaiveDate>,
}

impl From<Member> for DirectoryEntry {
    fn from(m: Member) -> Self {
        DirectoryEntry {
            id: m.id,
            full_name: m.full_name,
            member_no: m.member_no,
            office: m.office,
            cabinet_title: m.cabinet_title,
            email: m.email,
            phone: m.phone,
            joined_on: m.joined_on,
        }
    }
}

async fn directory(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<DirectoryEntry>>, AppError> {
    let mut members = state.profiles.members().await?;
    directory_order(&mut members);
    Ok(Json(members.into_iter().map(DirectoryEntry::from).collect()))
}

async fn member_detail(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, AppError> {
    let member = state
        .profiles
        .member(id)
        .await?
        .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
    Ok(Json(member))
}

/// Fields an admin manages on a profile. The id mirrors the auth
/// provider's user id; on create it may be omitted and one is assigned.
#[derive(Deserialize)]
struct MemberUpsert {
    id: Option<Uuid>,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    member_no: Option<String>,
    sponsor_id: Option<Uuid>,
    office: Option<ClubOffice>,
    cabinet_title: Option<String>,
    joined_on: Option<NaiveDate>,
    address: Option<String>,
    #[serde(default)]
    is_admin: bool,
}

impl MemberUpsert {
    fn into_member(self, id: Uuid, device_token: Option<String>) -> Member {
        Member {
            id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            member_no: self.member_no,
            is_admin: self.is_admin,
            sponsor_id: self.sponsor_id,
            office: self.office,
            cabinet_title: self.cabinet_title,
            joined_on: self.joined_on,
            address: self.address,
            device_token,
        }
    }
}

async fn create_member(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<MemberUpsert>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    if body.full_name.trim().is_empty() {
        return Err(ClubError::Validation("member name must not be empty".to_string()).into());
    }
    let id = body.id.unwrap_or_else(Uuid::new_v4);
    let member = body.into_member(id, None);
    state.profiles.upsert_member(&member).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MemberUpsert>,
) -> Result<Json<Member>, AppError> {
    if body.full_name.trim().is_empty() {
        return Err(ClubError::Validation("member name must not be empty".to_string()).into());
    }
    let existing = state
        .profiles
        .member(id)
        .await?
        .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
    // The device token is owned by the member's device, not the admin form.
    let member = body.into_member(id, existing.device_token);
    state.profiles.upsert_member(&member).await?;
    Ok(Json(member))
}

#[derive(Deserialize)]
struct AdminFlag {
    is_admin: bool,
}

async fn set_admin_flag(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminFlag>,
) -> Result<StatusCode, AppError> {
    state.profiles.set_admin(id, body.is_admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_member(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .profiles
        .member(id)
        .await?
        .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
    state.profiles.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct DeviceToken {
    device_token: Option<String>,
}

async fn register_device_token(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DeviceToken>,
) -> Result<StatusCode, AppError> {
    if user.0 != id {
        return Err(ClubError::Validation(
            "members can only register their own device token".to_string(),
        )
        .into());
    }
    state.profiles.set_device_token(id, body.device_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
