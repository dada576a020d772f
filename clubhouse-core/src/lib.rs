//! Shared types and core logic for the clubhouse ecosystem.
//!
//! The interesting parts live in three modules: [`sync`] (mirroring the
//! upstream calendar feed into the event store), [`attendance`] (one RSVP
//! per event/member pair) and [`view`] (pure projection of the event set
//! into day/week/month views). Everything else is the typed data model and
//! the storage/collaborator seams around those three.

pub mod attendance;
pub mod error;
pub mod event;
pub mod gallery;
pub mod member;
pub mod notice;
pub mod push;
pub mod store;
pub mod sync;
pub mod view;

pub use attendance::{AttendanceCounts, AttendanceLedger, AttendanceRecord, AttendanceStatus};
pub use error::{ClubError, ClubResult};
pub use event::{Event, EventDraft, EventKind, EventTime};
pub use gallery::{GalleryAlbum, GalleryPhoto, PhotoDraft};
pub use member::{ClubOffice, Member};
pub use notice::{Notice, NoticeDraft};
pub use push::{NotificationDispatcher, PushMessage};
pub use store::{AttendanceStore, EventStore, GalleryStore, MemoryStore, NoticeStore, ProfileStore};
pub use sync::{CalendarFeed, FeedEvent, SyncSummary, SyncWindow, run_sync};
pub use view::{Granularity, ViewState, project};
