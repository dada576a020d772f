//! Shared application state.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use chrono_tz::Tz;
use tracing::{info, warn};

use clubhouse_core::error::{ClubError, ClubResult};
use clubhouse_core::push::{NoopDispatcher, NotificationDispatcher};
use clubhouse_core::store::{
    AttendanceStore, EventStore, GalleryStore, MemoryStore, NoticeStore, ProfileStore,
};
use clubhouse_core::sync::{CalendarFeed, FeedEvent, SyncWindow};
use clubhouse_provider_google::GoogleCalendarFeed;

use crate::config::Config;
use crate::push::FcmDispatcher;
use crate::supabase::SupabaseStore;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub notices: Arc<dyn NoticeStore>,
    pub gallery: Arc<dyn GalleryStore>,
    pub feed: Arc<dyn CalendarFeed>,
    pub push: Arc<dyn NotificationDispatcher>,
    pub timezone: Tz,
    pub admin_token: Option<String>,
    /// Gates re-entrant sync triggers; syncs are manual and infrequent, so
    /// one at a time is plenty.
    pub sync_running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (events, attendance, profiles, notices, gallery) =
            match (&config.backend_url, &config.backend_key) {
                (Some(url), Some(key)) => {
                    info!("using hosted backend at {url}");
                    let store = Arc::new(SupabaseStore::new(url.clone(), key.clone()));
                    (
                        store.clone() as Arc<dyn EventStore>,
                        store.clone() as Arc<dyn AttendanceStore>,
                        store.clone() as Arc<dyn ProfileStore>,
                        store.clone() as Arc<dyn NoticeStore>,
                        store as Arc<dyn GalleryStore>,
                    )
                }
                _ => {
                    warn!("backend credentials not set, using in-memory store");
                    let store = Arc::new(MemoryStore::new());
                    (
                        store.clone() as Arc<dyn EventStore>,
                        store.clone() as Arc<dyn AttendanceStore>,
                        store.clone() as Arc<dyn ProfileStore>,
                        store.clone() as Arc<dyn NoticeStore>,
                        store as Arc<dyn GalleryStore>,
                    )
                }
            };

        let feed: Arc<dyn CalendarFeed> =
            match (&config.google_calendar_id, &config.google_api_key) {
                (Some(id), Some(key)) => {
                    Arc::new(GoogleCalendarFeed::new(id.clone(), key.clone()))
                }
                _ => {
                    warn!("calendar feed credentials not set, sync trigger will fail");
                    Arc::new(UnconfiguredFeed)
                }
            };

        let push: Arc<dyn NotificationDispatcher> = match &config.fcm_server_key {
            Some(key) => Arc::new(FcmDispatcher::new(
                config.fcm_endpoint.clone(),
                key.clone(),
                profiles.clone(),
            )),
            None => {
                info!("push gateway key not set, notices will not push");
                Arc::new(NoopDispatcher)
            }
        };

        AppState {
            events,
            attendance,
            profiles,
            notices,
            gallery,
            feed,
            push,
            timezone: config.timezone,
            admin_token: config.admin_token.clone(),
            sync_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// State backed entirely by one in-memory store; used by tests.
    #[cfg(test)]
    pub fn in_memory(feed: Arc<dyn CalendarFeed>) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            events: store.clone(),
            attendance: store.clone(),
            profiles: store.clone(),
            notices: store.clone(),
            gallery: store.clone(),
            feed,
            push: Arc::new(NoopDispatcher),
            timezone: chrono_tz::Asia::Tokyo,
            admin_token: Some("test-admin".to_string()),
            sync_running: Arc::new(AtomicBool::new(false)),
        };
        (state, store)
    }
}

/// Feed used when no calendar credentials are configured.
struct UnconfiguredFeed;

#[async_trait]
impl CalendarFeed for UnconfiguredFeed {
    async fn events_in(&self, _window: &SyncWindow) -> ClubResult<Vec<FeedEvent>> {
        Err(ClubError::Config(
            "GOOGLE_CALENDAR_ID / GOOGLE_API_KEY are not set".to_string(),
        ))
    }
}
