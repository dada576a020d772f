//! In-memory store implementing every storage trait.
//!
//! Used by the core test suite and as a stand-in backend when running the
//! server without hosted credentials. Single `Mutex` over all tables; this
//! is a test double, not a concurrent database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::error::{ClubError, ClubResult};
use crate::event::{Event, EventDraft};
use crate::gallery::{GalleryAlbum, GalleryPhoto, PhotoDraft};
use crate::member::Member;
use crate::notice::{Notice, NoticeDraft};
use crate::store::{AttendanceStore, EventStore, GalleryStore, NoticeStore, ProfileStore};
use crate::sync::{SyncWindow, SyncedEventDraft};

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    attendance: HashMap<(Uuid, Uuid), AttendanceRecord>,
    members: HashMap<Uuid, Member>,
    notices: HashMap<Uuid, Notice>,
    albums: HashMap<Uuid, GalleryAlbum>,
    photos: HashMap<Uuid, GalleryPhoto>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn locked(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn events_starting_from(&self, from: DateTime<Utc>) -> ClubResult<Vec<Event>> {
        let tables = self.locked();
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.start.sort_key(Tz::UTC) >= from)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start.sort_key(Tz::UTC));
        Ok(events)
    }

    async fn event(&self, id: Uuid) -> ClubResult<Option<Event>> {
        Ok(self.locked().events.get(&id).cloned())
    }

    async fn create_event(&self, draft: EventDraft) -> ClubResult<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            external_id: None,
            title: draft.title,
            description: draft.description,
            start: draft.start,
            location: draft.location,
            attachment_urls: vec![],
        };
        self.locked().events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> ClubResult<()> {
        let mut tables = self.locked();
        tables
            .events
            .remove(&id)
            .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
        tables.attendance.retain(|(event_id, _), _| *event_id != id);
        Ok(())
    }

    async fn add_attachment(&self, id: Uuid, url: String) -> ClubResult<Event> {
        let mut tables = self.locked();
        let event = tables
            .events
            .get_mut(&id)
            .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
        event.attachment_urls.push(url);
        Ok(event.clone())
    }

    async fn remove_attachment(&self, id: Uuid, url: &str) -> ClubResult<Event> {
        let mut tables = self.locked();
        let event = tables
            .events
            .get_mut(&id)
            .ok_or_else(|| ClubError::EventNotFound(id.to_string()))?;
        event.attachment_urls.retain(|u| u != url);
        Ok(event.clone())
    }

    async fn upsert_synced(&self, drafts: &[SyncedEventDraft]) -> ClubResult<()> {
        let mut tables = self.locked();
        for draft in drafts {
            let existing = tables
                .events
                .values_mut()
                .find(|e| e.external_id.as_deref() == Some(draft.external_id.as_str()));
            match existing {
                Some(event) => {
                    event.title = draft.title.clone();
                    event.description = draft.description.clone();
                    event.start = draft.start.clone();
                    event.location = draft.location.clone();
                }
                None => {
                    let event = Event {
                        id: Uuid::new_v4(),
                        external_id: Some(draft.external_id.clone()),
                        title: draft.title.clone(),
                        description: draft.description.clone(),
                        start: draft.start.clone(),
                        location: draft.location.clone(),
                        attachment_urls: vec![],
                    };
                    tables.events.insert(event.id, event);
                }
            }
        }
        Ok(())
    }

    async fn prune_synced(&self, window: &SyncWindow, keep: &[String]) -> ClubResult<u64> {
        let mut tables = self.locked();
        let before = tables.events.len();
        tables.events.retain(|_, event| match &event.external_id {
            Some(external_id) => {
                !window.contains(&event.start) || keep.iter().any(|k| k == external_id)
            }
            None => true,
        });
        Ok((before - tables.events.len()) as u64)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn set_status(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
        updated_at: DateTime<Utc>,
    ) -> ClubResult<()> {
        self.locked().attendance.insert(
            (event_id, user_id),
            AttendanceRecord {
                event_id,
                user_id,
                status,
                updated_at,
            },
        );
        Ok(())
    }

    async fn clear_status(&self, event_id: Uuid, user_id: Uuid) -> ClubResult<()> {
        self.locked().attendance.remove(&(event_id, user_id));
        Ok(())
    }

    async fn status_of(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<AttendanceStatus>> {
        Ok(self
            .locked()
            .attendance
            .get(&(event_id, user_id))
            .map(|r| r.status))
    }

    async fn for_event(&self, event_id: Uuid) -> ClubResult<Vec<AttendanceRecord>> {
        Ok(self
            .locked()
            .attendance
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn for_events(&self, event_ids: &[Uuid]) -> ClubResult<Vec<AttendanceRecord>> {
        Ok(self
            .locked()
            .attendance
            .values()
            .filter(|r| event_ids.contains(&r.event_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn members(&self) -> ClubResult<Vec<Member>> {
        Ok(self.locked().members.values().cloned().collect())
    }

    async fn member(&self, id: Uuid) -> ClubResult<Option<Member>> {
        Ok(self.locked().members.get(&id).cloned())
    }

    async fn member_count(&self) -> ClubResult<u64> {
        Ok(self.locked().members.len() as u64)
    }

    async fn upsert_member(&self, member: &Member) -> ClubResult<()> {
        self.locked().members.insert(member.id, member.clone());
        Ok(())
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> ClubResult<()> {
        let mut tables = self.locked();
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
        member.is_admin = is_admin;
        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> ClubResult<()> {
        let mut tables = self.locked();
        tables
            .members
            .remove(&id)
            .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
        tables.attendance.retain(|(_, user_id), _| *user_id != id);
        Ok(())
    }

    async fn set_device_token(&self, id: Uuid, token: Option<String>) -> ClubResult<()> {
        let mut tables = self.locked();
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| ClubError::MemberNotFound(id.to_string()))?;
        member.device_token = token;
        Ok(())
    }

    async fn device_tokens(&self, target: Option<Uuid>) -> ClubResult<Vec<String>> {
        Ok(self
            .locked()
            .members
            .values()
            .filter(|m| target.is_none_or(|id| m.id == id))
            .filter_map(|m| m.device_token.clone())
            .collect())
    }
}

#[async_trait]
impl NoticeStore for MemoryStore {
    async fn notices(&self) -> ClubResult<Vec<Notice>> {
        let mut notices: Vec<Notice> = self.locked().notices.values().cloned().collect();
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notices)
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
        self.locked().notices.insert(notice.id, notice.clone());
        Ok(notice)
    }

    async fn update_notice(&self, id: Uuid, draft: &NoticeDraft) -> ClubResult<Notice> {
        let mut tables = self.locked();
        let notice = tables
            .notices
            .get_mut(&id)
            .ok_or_else(|| ClubError::NoticeNotFound(id.to_string()))?;
        notice.title = draft.title.clone();
        notice.content = draft.content.clone();
        notice.is_important = draft.is_important;
        notice.target_user_id = draft.target_user_id;
        notice.expires_at = draft.expires_at;
        notice.attachment_url = draft.attachment_url.clone();
        Ok(notice.clone())
    }

    async fn delete_notice(&self, id: Uuid) -> ClubResult<()> {
        self.locked()
            .notices
            .remove(&id)
            .ok_or_else(|| ClubError::NoticeNotFound(id.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn albums(&self) -> ClubResult<Vec<GalleryAlbum>> {
        let mut albums: Vec<GalleryAlbum> = self.locked().albums.values().cloned().collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    async fn album(&self, id: Uuid) -> ClubResult<Option<GalleryAlbum>> {
        Ok(self.locked().albums.get(&id).cloned())
    }

    async fn create_album(&self, name: &str) -> ClubResult<GalleryAlbum> {
        let album = GalleryAlbum {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.locked().albums.insert(album.id, album.clone());
        Ok(album)
    }

    async fn delete_album(&self, id: Uuid) -> ClubResult<()> {
        let mut tables = self.locked();
        tables
            .albums
            .remove(&id)
            .ok_or_else(|| ClubError::AlbumNotFound(id.to_string()))?;
        tables.photos.retain(|_, p| p.album_id != id);
        Ok(())
    }

    async fn photos(&self, album_id: Uuid) -> ClubResult<Vec<GalleryPhoto>> {
        let mut photos: Vec<GalleryPhoto> = self
            .locked()
            .photos
            .values()
            .filter(|p| p.album_id == album_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(photos)
    }

    async fn add_photo(&self, album_id: Uuid, draft: &PhotoDraft) -> ClubResult<GalleryPhoto> {
        let mut tables = self.locked();
        if !tables.albums.contains_key(&album_id) {
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
        if let Some(album) = tables.albums.get_mut(&album_id) {
            album.updated_at = Some(photo.created_at);
        }
        tables.photos.insert(photo.id, photo.clone());
        Ok(photo)
    }

    async fn delete_photo(&self, id: Uuid) -> ClubResult<()> {
        self.locked().photos.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceLedger;

    #[tokio::test]
    async fn attendance_pair_never_duplicates() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        for status in [
            AttendanceStatus::Attending,
            AttendanceStatus::Absent,
            AttendanceStatus::Attending,
            AttendanceStatus::Pending,
            AttendanceStatus::Absent,
        ] {
            store
                .set_status(event_id, user_id, status, Utc::now())
                .await
                .unwrap();
        }

        let records = store.for_event(event_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Absent);
    }

    #[tokio::test]
    async fn ledger_skips_write_when_answer_is_unchanged() {
        let store = MemoryStore::new();
        let ledger = AttendanceLedger::new(&store);
        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        assert!(ledger
            .set_status(event_id, user_id, AttendanceStatus::Attending, now)
            .await
            .unwrap());
        assert!(!ledger
            .set_status(event_id, user_id, AttendanceStatus::Attending, now)
            .await
            .unwrap());
        // Pending is always written through
        assert!(ledger
            .set_status(event_id, user_id, AttendanceStatus::Pending, now)
            .await
            .unwrap());
        assert!(ledger
            .set_status(event_id, user_id, AttendanceStatus::Pending, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn clear_status_reverts_to_implicit_pending() {
        let store = MemoryStore::new();
        let ledger = AttendanceLedger::new(&store);
        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        ledger
            .set_status(event_id, user_id, AttendanceStatus::Attending, Utc::now())
            .await
            .unwrap();
        ledger.clear_status(event_id, user_id).await.unwrap();

        assert_eq!(store.status_of(event_id, user_id).await.unwrap(), None);
        assert!(store.for_event(event_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counts_come_from_records_not_roster() {
        let store = MemoryStore::new();
        let ledger = AttendanceLedger::new(&store);
        let event_id = Uuid::new_v4();

        // 10 members on the roster, 6 answer
        for i in 0..10 {
            let member = Member {
                id: Uuid::new_v4(),
                full_name: format!("member {i}"),
                email: None,
                phone: None,
                member_no: Some(format!("{}", i + 1)),
                is_admin: false,
                sponsor_id: None,
                office: None,
                cabinet_title: None,
                joined_on: None,
                address: None,
                device_token: None,
            };
            store.upsert_member(&member).await.unwrap();
            if i < 4 {
                ledger
                    .set_status(event_id, member.id, AttendanceStatus::Attending, Utc::now())
                    .await
                    .unwrap();
            } else if i < 6 {
                ledger
                    .set_status(event_id, member.id, AttendanceStatus::Absent, Utc::now())
                    .await
                    .unwrap();
            }
        }

        let counts = ledger.counts_for(event_id).await.unwrap();
        assert_eq!(counts.attending, 4);
        assert_eq!(counts.absent, 2);
        assert_eq!(counts.responded(), 6);
        assert_eq!(store.member_count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn deleting_a_member_drops_their_answers() {
        let store = MemoryStore::new();
        let member = Member {
            id: Uuid::new_v4(),
            full_name: "退会者".to_string(),
            email: None,
            phone: None,
            member_no: None,
            is_admin: false,
            sponsor_id: None,
            office: None,
            cabinet_title: None,
            joined_on: None,
            address: None,
            device_token: None,
        };
        store.upsert_member(&member).await.unwrap();
        let event_id = Uuid::new_v4();
        store
            .set_status(event_id, member.id, AttendanceStatus::Attending, Utc::now())
            .await
            .unwrap();

        store.delete_member(member.id).await.unwrap();
        assert!(store.for_event(event_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn device_tokens_can_be_narrowed_to_one_member() {
        let store = MemoryStore::new();
        let mut ids = vec![];
        for i in 0..3 {
            let member = Member {
                id: Uuid::new_v4(),
                full_name: format!("member {i}"),
                email: None,
                phone: None,
                member_no: None,
                is_admin: false,
                sponsor_id: None,
                office: None,
                cabinet_title: None,
                joined_on: None,
                address: None,
                device_token: (i != 1).then(|| format!("token-{i}")),
            };
            store.upsert_member(&member).await.unwrap();
            ids.push(member.id);
        }

        assert_eq!(store.device_tokens(None).await.unwrap().len(), 2);
        assert_eq!(
            store.device_tokens(Some(ids[0])).await.unwrap(),
            vec!["token-0"]
        );
        // Target without a registered token
        assert!(store.device_tokens(Some(ids[1])).await.unwrap().is_empty());
    }
}
