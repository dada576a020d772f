//! Event reads and admin event management.
//!
//! `/dashboard` is the member home payload: upcoming events with attendance
//! aggregates, the latest visible notice and the member total. `/events/view`
//! applies the day/week/month projection server-side so every client renders
//! the same list.

use std::collections::{HashMap, HashSet};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clubhouse_core::attendance::{
    AttendanceCounts, AttendanceRecord, AttendanceStatus, count_by_status,
};
use clubhouse_core::error::ClubError;
use clubhouse_core::event::{Event, EventDraft, EventKind};
use clubhouse_core::notice::Notice;
use clubhouse_core::view::{Granularity, ViewState, project};

use crate::routes::{
    AppError,
    auth::{CurrentUser, RequireAdmin},
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/events/view", get(projected_view))
        .route("/events", post(create_event))
        .route("/events/{id}", delete(remove_event))
        .route(
            "/events/{id}/attachments",
            post(add_attachment).delete(remove_attachment),
        )
        .route("/events/{id}/attendance", get(event_roster))
}

/// One event as rendered on member screens.
#[derive(Serialize)]
struct EventView {
    #[serde(flatten)]
    event: Event,
    kind: EventKind,
    display_title: String,
    #[serde(flatten)]
    counts: AttendanceCounts,
    responded: usize,
    my_status: AttendanceStatus,
}

fn event_view(event: Event, records: &[AttendanceRecord], user_id: Uuid) -> EventView {
    let kind = event.kind();
    let display_title = event.clean_title().to_string();
    let counts = count_by_status(records);
    let my_status = records
        .iter()
        .find(|r| r.user_id == user_id)
        .map(|r| r.status)
        .unwrap_or(AttendanceStatus::Pending);
    EventView {
        event,
        kind,
        display_title,
        counts,
        responded: counts.responded(),
        my_status,
    }
}

/// Events from `from` onward, each paired with its attendance records.
async fn load_event_views(
    state: &AppState,
    user_id: Uuid,
    from: DateTime<Utc>,
) -> Result<Vec<EventView>, AppError> {
    let events = state.events.events_starting_from(from).await?;
    let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let records = state.attendance.for_events(&ids).await?;

    let mut by_event: HashMap<Uuid, Vec<AttendanceRecord>> = HashMap::new();
    for record in records {
        by_event.entry(record.event_id).or_default().push(record);
    }

    Ok(events
        .into_iter()
        .map(|event| {
            let records = by_event.remove(&event.id).unwrap_or_default();
            event_view(event, &records, user_id)
        })
        .collect())
}

#[derive(Serialize)]
struct DashboardResponse {
    events: Vec<EventView>,
    latest_notice: Option<Notice>,
    total_member_count: u64,
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let now = Utc::now();
    // A month of history so the dashboard can scroll back past today.
    let from = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let events = load_event_views(&state, user.0, from).await?;

    let latest_notice = state
        .notices
        .notices()
        .await?
        .into_iter()
        .find(|n| n.is_visible_to(user.0, now));
    let total_member_count = state.profiles.member_count().await?;

    Ok(Json(DashboardResponse {
        events,
        latest_notice,
        total_member_count,
    }))
}

#[derive(Deserialize)]
struct ViewQuery {
    granularity: Option<Granularity>,
    anchor: Option<NaiveDate>,
    pinned: Option<NaiveDate>,
}

#[derive(Serialize)]
struct ViewResponse {
    view: ViewState,
    today_in_range: bool,
    events: Vec<EventView>,
}

async fn projected_view(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ViewResponse>, AppError> {
    let now = Utc::now();
    let today = now.with_timezone(&state.timezone).date_naive();
    let view = ViewState {
        granularity: query.granularity.unwrap_or(Granularity::Week),
        anchor: query.anchor.unwrap_or(today),
        pinned: query.pinned,
    };

    // Everything the sync window can hold, so month navigation a year out
    // still projects from a complete set.
    let from = now.checked_sub_months(Months::new(13)).unwrap_or(now);
    let views = load_event_views(&state, user.0, from).await?;

    let events: Vec<Event> = views.iter().map(|v| v.event.clone()).collect();
    let shown: HashSet<Uuid> = project(&events, &view, state.timezone)
        .into_iter()
        .map(|e| e.id)
        .collect();

    let mut selected: Vec<EventView> =
        views.into_iter().filter(|v| shown.contains(&v.event.id)).collect();
    selected.sort_by_key(|v| v.event.start.sort_key(state.timezone));

    Ok(Json(ViewResponse {
        today_in_range: view.is_today_in_range(today),
        view,
        events: selected,
    }))
}

async fn create_event(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    if draft.title.trim().is_empty() {
        return Err(ClubError::Validation("event title must not be empty".to_string()).into());
    }
    let event = state.events.create_event(draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn remove_event(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .events
        .event(id)
        .await?
        .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
    state.events.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct AttachmentBody {
    url: String,
}

async fn add_attachment(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AttachmentBody>,
) -> Result<Json<Event>, AppError> {
    if body.url.trim().is_empty() {
        return Err(ClubError::Validation("attachment url must not be empty".to_string()).into());
    }
    let event = state.events.add_attachment(id, body.url).await?;
    Ok(Json(event))
}

async fn remove_attachment(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AttachmentBody>,
) -> Result<Json<Event>, AppError> {
    let event = state.events.remove_attachment(id, &body.url).await?;
    Ok(Json(event))
}

#[derive(Serialize)]
struct RosterEntry {
    user_id: Uuid,
    full_name: String,
    member_no: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct UnansweredEntry {
    user_id: Uuid,
    full_name: String,
    member_no: Option<String>,
}

/// Per-event roster for the admin attendance screen.
#[derive(Serialize)]
struct RosterResponse {
    attending: Vec<RosterEntry>,
    absent: Vec<RosterEntry>,
    unanswered: Vec<UnansweredEntry>,
}

async fn event_roster(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RosterResponse>, AppError> {
    state
        .events
        .event(id)
        .await?
        .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;

    let records = state.attendance.for_event(id).await?;
    let members = state.profiles.members().await?;
    let by_id: HashMap<Uuid, &clubhouse_core::member::Member> =
        members.iter().map(|m| (m.id, m)).collect();

    let mut attending = Vec::new();
    let mut absent = Vec::new();
    let mut answered = HashSet::new();
    for record in &records {
        // An explicit "pending" row is still an unanswered member.
        let bucket = match record.status {
            AttendanceStatus::Attending => &mut attending,
            AttendanceStatus::Absent => &mut absent,
            AttendanceStatus::Pending => continue,
        };
        let Some(member) = by_id.get(&record.user_id) else {
            continue;
        };
        answered.insert(record.user_id);
        bucket.push(RosterEntry {
            user_id: record.user_id,
            full_name: member.full_name.clone(),
            member_no: member.member_no.clone(),
            updated_at: record.updated_at,
        });
    }

    let unanswered = members
        .iter()
        .filter(|m| !answered.contains(&m.id))
        .map(|m| UnansweredEntry {
            user_id: m.id,
            full_name: m.full_name.clone(),
            member_no: m.member_no.clone(),
        })
        .collect();

    Ok(Json(RosterResponse {
        attending,
        absent,
        unanswered,
    }))
}
