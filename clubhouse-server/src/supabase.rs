//! Store implementation over a hosted PostgREST backend.
//!
//! Every trait method maps to one or two REST calls against `/rest/v1`.
//! Upserts use `on_conflict` plus the merge-duplicates preference, counts
//! come from the `Content-Range` header. Row ids and timestamps are
//! assigned client-side so the wire types stay symmetric with the core
//! models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use clubhouse_core::attendance::{AttendanceRecord, AttendanceStatus};
use clubhouse_core::error::{ClubError, ClubResult};
use clubhouse_core::event::{Event, EventDraft, EventTime};
use clubhouse_core::gallery::{GalleryAlbum, GalleryPhoto, PhotoDraft};
use clubhouse_core::member::Member;
use clubhouse_core::notice::{Notice, NoticeDraft};
use clubhouse_core::store::{
    AttendanceStore, EventStore, GalleryStore, NoticeStore, ProfileStore,
};
use clubhouse_core::sync::{SyncWindow, SyncedEventDraft};

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        SupabaseStore {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> ClubResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ClubError::Store(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClubError::Store(format!("backend returned {status}: {body}")))
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> ClubResult<Vec<T>> {
        let response = self.send(self.request(Method::GET, table).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| ClubError::Serialization(e.to_string()))
    }

    /// Insert-or-overwrite on the given conflict key.
    async fn upsert<T: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &T,
    ) -> ClubResult<()> {
        self.send(
            self.request(Method::POST, table)
                .query(&[("on_conflict", on_conflict)])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }

    /// Insert a fully-formed row and return the stored representation.
    async fn insert_returning<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> ClubResult<R> {
        let response = self
            .send(
                self.request(Method::POST, table)
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .await?;
        let mut rows: Vec<R> = response
            .json()
            .await
            .map_err(|e| ClubError::Serialization(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| ClubError::Store(format!("{table}: insert returned no row")))
    }
}

/// Row count from a `Content-Range` header such as `0-24/25` or `*/0`.
fn content_range_total(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("content-range")?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

// ---------------------------------------------------------------------------
// Events

/// The events table row. `start_time` is text because the upstream feed
/// emits either a timestamp or a bare date; decoding happens on read and
/// rows that fail to decode are dropped with a warning.
#[derive(Serialize, Deserialize)]
struct EventRow {
    id: Uuid,
    external_id: Option<String>,
    title: String,
    description: Option<String>,
    start_time: String,
    location: Option<String>,
    #[serde(default)]
    attachment_urls: Vec<String>,
}

impl EventRow {
    fn into_event(self) -> Option<Event> {
        let Some(start) = EventTime::parse(&self.start_time) else {
            warn!(id = %self.id, raw = %self.start_time, "dropping event with undecodable start_time");
            return None;
        };
        Some(Event {
            id: self.id,
            external_id: self.external_id,
            title: self.title,
            description: self.description,
            start,
            location: self.location,
            attachment_urls: self.attachment_urls,
        })
    }
}

/// Sync upsert payload; omits id and attachment_urls so merge-duplicates
/// leaves both alone on existing rows.
#[derive(Serialize)]
struct SyncedRow<'a> {
    external_id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    start_time: String,
    location: Option<&'a str>,
}

#[async_trait]
impl EventStore for SupabaseStore {
    async fn events_starting_from(&self, from: DateTime<Utc>) -> ClubResult<Vec<Event>> {
        // start_time is text, so the server-side filter is day-granular;
        // the precise cut and the ordering happen after decoding.
        let day = from.format("%Y-%m-%d").to_string();
        let rows: Vec<EventRow> = self
            .fetch_rows("events", &[("start_time", format!("gte.{day}"))])
            .await?;
        let mut events: Vec<Event> = rows
            .into_iter()
            .filter_map(EventRow::into_event)
            .filter(|e| e.start.sort_key(chrono_tz::Tz::UTC) >= from)
            .collect();
        events.sort_by_key(|e| e.start.sort_key(chrono_tz::Tz::UTC));
        Ok(events)
    }

    async fn event(&self, id: Uuid) -> ClubResult<Option<Event>> {
        let mut rows: Vec<EventRow> = self
            .fetch_rows(
                "events",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop().and_then(EventRow::into_event))
    }

    async fn create_event(&self, draft: EventDraft) -> ClubResult<Event> {
        let row = EventRow {
            id: Uuid::new_v4(),
            external_id: None,
            title: draft.title,
            description: draft.description,
            start_time: draft.start.to_wire(),
            location: draft.location,
            attachment_urls: vec![],
        };
        let stored: EventRow = self.insert_returning("events", &row).await?;
        stored
            .into_event()
            .ok_or_else(|| ClubError::Store("stored event failed to decode".to_string()))
    }

    async fn delete_event(&self, id: Uuid) -> ClubResult<()> {
        // Attendance rows go with it via the FK cascade.
        self.send(
            self.request(Method::DELETE, "events")
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn add_attachment(&self, id: Uuid, url: String) -> ClubResult<Event> {
        let mut event = self
            .event(id)
            .await?
            .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
        if !event.attachment_urls.contains(&url) {
            event.attachment_urls.push(url);
            self.send(
                self.request(Method::PATCH, "events")
                    .query(&[("id", format!("eq.{id}"))])
                    .json(&json!({ "attachment_urls": event.attachment_urls })),
            )
            .await?;
        }
        Ok(event)
    }

    async fn remove_attachment(&self, id: Uuid, url: &str) -> ClubResult<Event> {
        let mut event = self
            .event(id)
            .await?
            .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
        if let Some(pos) = event.attachment_urls.iter().position(|u| u == url) {
            event.attachment_urls.remove(pos);
            self.send(
                self.request(Method::PATCH, "events")
                    .query(&[("id", format!("eq.{id}"))])
                    .json(&json!({ "attachment_urls": event.attachment_urls })),
            )
            .await?;
        }
        Ok(event)
    }

    async fn upsert_synced(&self, drafts: &[SyncedEventDraft]) -> ClubResult<()> {
        let rows: Vec<SyncedRow<'_>> = drafts
            .iter()
            .map(|d| SyncedRow {
                external_id: &d.external_id,
                title: &d.title,
                description: d.description.as_deref(),
                start_time: d.start.to_wire(),
                location: d.location.as_deref(),
            })
            .collect();
        self.upsert("events", "external_id", &rows).await
    }

    async fn prune_synced(&self, window: &SyncWindow, keep: &[String]) -> ClubResult<u64> {
        // Window bounds are month starts, so comparing the text column at
        // day granularity matches both wire shapes.
        let mut query = vec![
            ("start_time", format!("gte.{}", window.from.format("%Y-%m-%d"))),
            ("start_time", format!("lt.{}", window.to.format("%Y-%m-%d"))),
            ("external_id", "not.is.null".to_string()),
        ];
        if !keep.is_empty() {
            let quoted: Vec<String> = keep.iter().map(|id| format!("\"{id}\"")).collect();
            query.push(("external_id", format!("not.in.({})", quoted.join(","))));
        }
        let response = self
            .send(
                self.request(Method::DELETE, "events")
                    .query(&query)
                    .header("Prefer", "count=exact"),
            )
            .await?;
        Ok(content_range_total(&response).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Attendance

#[derive(Deserialize)]
struct StatusOnly {
    status: AttendanceStatus,
}

#[async_trait]
impl AttendanceStore for SupabaseStore {
    async fn set_status(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
        updated_at: DateTime<Utc>,
    ) -> ClubResult<()> {
        let record = AttendanceRecord {
            event_id,
            user_id,
            status,
            updated_at,
        };
        self.upsert("attendance", "event_id,user_id", &[record]).await
    }

    async fn clear_status(&self, event_id: Uuid, user_id: Uuid) -> ClubResult<()> {
        self.send(
            self.request(Method::DELETE, "attendance").query(&[
                ("event_id", format!("eq.{event_id}")),
                ("user_id", format!("eq.{user_id}")),
            ]),
        )
        .await?;
        Ok(())
    }

    async fn status_of(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<AttendanceStatus>> {
        let mut rows: Vec<StatusOnly> = self
            .fetch_rows(
                "attendance",
                &[
                    ("select", "status".to_string()),
                    ("event_id", format!("eq.{event_id}")),
                    ("user_id", format!("eq.{user_id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.pop().map(|r| r.status))
    }

    async fn for_event(&self, event_id: Uuid) -> ClubResult<Vec<AttendanceRecord>> {
        self.fetch_rows("attendance", &[("event_id", format!("eq.{event_id}"))])
            .await
    }

    async fn for_events(&self, event_ids: &[Uuid]) -> ClubResult<Vec<AttendanceRecord>> {
        if event_ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<String> = event_ids.iter().map(Uuid::to_string).collect();
        self.fetch_rows(
            "attendance",
            &[("event_id", format!("in.({})", ids.join(",")))],
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Profiles

#[derive(Deserialize)]
struct TokenOnly {
    device_token: String,
}

#[async_trait]
impl ProfileStore for SupabaseStore {
    async fn members(&self) -> ClubResult<Vec<Member>> {
        self.fetch_rows("profiles", &[]).await
    }

    async fn member(&self, id: Uuid) -> ClubResult<Option<Member>> {
        let mut rows: Vec<Member> = self
            .fetch_rows(
                "profiles",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn member_count(&self) -> ClubResult<u64> {
        let response = self
            .send(
                self.request(Method::GET, "profiles")
                    .query(&[("select", "id"), ("limit", "1")])
                    .header("Prefer", "count=exact"),
            )
            .await?;
        content_range_total(&response)
            .ok_or_else(|| ClubError::Store("backend returned no row count".to_string()))
    }

    async fn upsert_member(&self, member: &Member) -> ClubResult<()> {
        self.upsert("profiles", "id", &[member]).await
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> ClubResult<()> {
        let response = self
            .send(
                self.request(Method::PATCH, "profiles")
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", "return=representation")
                    .json(&json!({ "is_admin": is_admin })),
            )
            .await?;
        let rows: Vec<Member> = response
            .json()
            .await
            .map_err(|e| ClubError::Serialization(e.to_string()))?;
        if rows.is_empty() {
            return Err(ClubError::MemberNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> ClubResult<()> {
        self.send(
            self.request(Method::DELETE, "profiles")
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn set_device_token(&self, id: Uuid, token: Option<String>) -> ClubResult<()> {
        self.send(
            self.request(Method::PATCH, "profiles")
                .query(&[("id", format!("eq.{id}"))])
                .json(&json!({ "device_token": token })),
        )
        .await?;
        Ok(())
    }

    async fn device_tokens(&self, target: Option<Uuid>) -> ClubResult<Vec<String>> {
        let mut query = vec![
            ("select", "device_token".to_string()),
            ("device_token", "not.is.null".to_string()),
        ];
        if let Some(id) = target {
            query.push(("id", format!("eq.{id}")));
        }
        let rows: Vec<TokenOnly> = self.fetch_rows("profiles", &query).await?;
        Ok(rows.into_iter().map(|r| r.device_token).collect())
    }
}

// ---------------------------------------------------------------------------
// Notices

#[async_trait]
impl NoticeStore for SupabaseStore {
    async fn notices(&self) -> ClubResult<Vec<Notice>> {
        self.fetch_rows("notices", &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn create_notice(&self, draft: &NoticeDraft) -> ClubResult<Notice> {
        let notice = Notice {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            is_important: draft.is_important,
            target_user_id: draft.target_user_id,
            expires_at: draft.expires_at,
            attachment_url: draft.attachment_url.clone(),
            created_at: Utc::now(),
        };
        self.insert_returning("notices", &notice).await
    }

    async fn update_notice(&self, id: Uuid, draft: &NoticeDraft) -> ClubResult<Notice> {
        let response = self
            .send(
                self.request(Method::PATCH, "notices")
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", "return=representation")
                    .json(&json!({
                        "title": draft.title,
                        "content": draft.content,
                        "is_important": draft.is_important,
                        "target_user_id": draft.target_user_id,
                        "expires_at": draft.expires_at,
                        "attachment_url": draft.attachment_url,
                    })),
            )
            .await?;
        let mut rows: Vec<Notice> = response
            .json()
            .await
            .map_err(|e| ClubError::Serialization(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| ClubError::NoticeNotFound(id.to_string()))
    }

    async fn delete_notice(&self, id: Uuid) -> ClubResult<()> {
        self.send(
            self.request(Method::DELETE, "notices")
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Gallery

#[async_trait]
impl GalleryStore for SupabaseStore {
    async fn albums(&self) -> ClubResult<Vec<GalleryAlbum>> {
        self.fetch_rows("gallery_albums", &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn album(&self, id: Uuid) -> ClubResult<Option<GalleryAlbum>> {
        let mut rows: Vec<GalleryAlbum> = self
            .fetch_rows(
                "gallery_albums",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn create_album(&self, name: &str) -> ClubResult<GalleryAlbum> {
        let album = GalleryAlbum {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.insert_returning("gallery_albums", &album).await
    }

    async fn delete_album(&self, id: Uuid) -> ClubResult<()> {
        // Photo rows first; the albums table has no cascade.
        self.send(
            self.request(Method::DELETE, "gallery_photos")
                .query(&[("album_id", format!("eq.{id}"))]),
        )
        .await?;
        self.send(
            self.request(Method::DELETE, "gallery_albums")
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn photos(&self, album_id: Uuid) -> ClubResult<Vec<GalleryPhoto>> {
        self.fetch_rows(
            "gallery_photos",
            &[
                ("album_id", format!("eq.{album_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn add_photo(&self, album_id: Uuid, draft: &PhotoDraft) -> ClubResult<GalleryPhoto> {
        if self.album(album_id).await?.is_none() {
            return Err(ClubError::AlbumNotFound(album_id.to_string()));
        }
        let photo = GalleryPhoto {
            id: Uuid::new_v4(),
            album_id,
            url: draft.url.clone(),
            storage_path: draft.storage_path.clone(),
            caption: draft.caption.clone(),
            uploaded_by: draft.uploaded_by,
            created_at: Utc::now(),
        };
        let stored: GalleryPhoto = self.insert_returning("gallery_photos", &photo).await?;
        // Bump the album so "recently updated" sorts stay honest.
        self.send(
            self.request(Method::PATCH, "gallery_albums")
                .query(&[("id", format!("eq.{album_id}"))])
                .json(&json!({ "updated_at": Utc::now() })),
        )
        .await?;
        Ok(stored)
    }

    async fn delete_photo(&self, id: Uuid) -> ClubResult<()> {
        self.send(
            self.request(Method::DELETE, "gallery_photos")
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }
}
