//! Storage traits.
//!
//! Every persistence operation is a passthrough to the hosted backend; these
//! traits are the seam between the core logic and whichever client talks to
//! it. The server wires in a REST-backed implementation, tests use
//! [`memory::MemoryStore`]. All traits are dyn-compatible so app state can
//! hold them as trait objects.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::error::ClubResult;
use crate::event::{Event, EventDraft};
use crate::gallery::{GalleryAlbum, GalleryPhoto, PhotoDraft};
use crate::member::Member;
use crate::notice::{Notice, NoticeDraft};
use crate::sync::{SyncWindow, SyncedEventDraft};

pub use memory::MemoryStore;

/// Event rows. Synced rows (non-null external_id) are owned by the sync
/// engine; `upsert_synced` and `prune_synced` are its only write paths.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events starting at or after `from`, ordered by start ascending.
    async fn events_starting_from(&self, from: DateTime<Utc>) -> ClubResult<Vec<Event>>;

    async fn event(&self, id: Uuid) -> ClubResult<Option<Event>>;

    /// Create a club-local event (external_id stays null).
    async fn create_event(&self, draft: EventDraft) -> ClubResult<Event>;

    async fn delete_event(&self, id: Uuid) -> ClubResult<()>;

    /// Append a link to the event's attachment list.
    async fn add_attachment(&self, id: Uuid, url: String) -> ClubResult<Event>;

    /// Remove a link from the event's attachment list.
    async fn remove_attachment(&self, id: Uuid, url: &str) -> ClubResult<Event>;

    /// Insert-or-overwrite keyed on external_id. Overwrites title,
    /// description, start and location unconditionally; never touches
    /// attachment_urls.
    async fn upsert_synced(&self, drafts: &[SyncedEventDraft]) -> ClubResult<()>;

    /// Delete every event whose start falls inside `window`, whose
    /// external_id is non-null and not in `keep`. Returns the number of
    /// rows removed.
    async fn prune_synced(&self, window: &SyncWindow, keep: &[String]) -> ClubResult<u64>;
}

/// Attendance rows, unique on (event_id, user_id).
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Upsert on the composite key, stamping updated_at.
    async fn set_status(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
        updated_at: DateTime<Utc>,
    ) -> ClubResult<()>;

    /// Delete the row, reverting the pair to implicit "pending".
    async fn clear_status(&self, event_id: Uuid, user_id: Uuid) -> ClubResult<()>;

    async fn status_of(&self, event_id: Uuid, user_id: Uuid)
    -> ClubResult<Option<AttendanceStatus>>;

    async fn for_event(&self, event_id: Uuid) -> ClubResult<Vec<AttendanceRecord>>;

    async fn for_events(&self, event_ids: &[Uuid]) -> ClubResult<Vec<AttendanceRecord>>;
}

/// Member profiles. Credentials live with the auth provider; this is just
/// the directory row keyed on the same id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn members(&self) -> ClubResult<Vec<Member>>;

    async fn member(&self, id: Uuid) -> ClubResult<Option<Member>>;

    async fn member_count(&self) -> ClubResult<u64>;

    /// Insert-or-overwrite keyed on id (mirrors the auth provider's user).
    async fn upsert_member(&self, member: &Member) -> ClubResult<()>;

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> ClubResult<()>;

    async fn delete_member(&self, id: Uuid) -> ClubResult<()>;

    async fn set_device_token(&self, id: Uuid, token: Option<String>) -> ClubResult<()>;

    /// Registered device tokens; a target narrows to one member, otherwise
    /// every member with a token.
    async fn device_tokens(&self, target: Option<Uuid>) -> ClubResult<Vec<String>>;
}

/// Notices, newest first.
#[async_trait]
pub trait NoticeStore: Send + Sync {
    async fn notices(&self) -> ClubResult<Vec<Notice>>;

    async fn create_notice(&self, draft: &NoticeDraft) -> ClubResult<Notice>;

    async fn update_notice(&self, id: Uuid, draft: &NoticeDraft) -> ClubResult<Notice>;

    async fn delete_notice(&self, id: Uuid) -> ClubResult<()>;
}

/// Gallery album and photo rows.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn albums(&self) -> ClubResult<Vec<GalleryAlbum>>;

    async fn album(&self, id: Uuid) -> ClubResult<Option<GalleryAlbum>>;

    async fn create_album(&self, name: &str) -> ClubResult<GalleryAlbum>;

    /// Deletes the album and its photo rows.
    async fn delete_album(&self, id: Uuid) -> ClubResult<()>;

    async fn photos(&self, album_id: Uuid) -> ClubResult<Vec<GalleryPhoto>>;

    async fn add_photo(&self, album_id: Uuid, draft: &PhotoDraft) -> ClubResult<GalleryPhoto>;

    async fn delete_photo(&self, id: Uuid) -> ClubResult<()>;
}
