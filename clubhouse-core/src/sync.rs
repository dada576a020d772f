//! Calendar sync engine.
//!
//! Makes the local event set for a rolling time window exactly mirror the
//! upstream calendar feed: upsert everything the feed returns (keyed on the
//! upstream id, upstream wins), then prune windowed rows whose upstream id
//! has disappeared. The two phases are deliberately not atomic: a fetch or
//! upsert failure aborts the whole run, a prune failure only logs a warning.
//! Getting fresh data in matters more than removing stale rows, and the next
//! run cleans up anyway.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClubError, ClubResult};
use crate::event::{EventTime, UNTITLED};
use crate::store::EventStore;

/// The rolling time range considered authoritative for mirroring:
/// [start of last month, start of the month 12 months from now).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    /// Window anchored at `now`: roughly 13 months, one back and twelve
    /// ahead, aligned to month starts.
    pub fn rolling(now: DateTime<Utc>) -> Self {
        let first_of_month = month_start(now.date_naive());
        // Month arithmetic from day 1 can't overflow the day of month
        let from = first_of_month - Months::new(1);
        let to = first_of_month + Months::new(12);
        SyncWindow {
            from: midnight_utc(from),
            to: midnight_utc(to),
        }
    }

    pub fn contains(&self, time: &EventTime) -> bool {
        time.is_in(self.from, self.to, chrono_tz::Tz::UTC)
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 exists in every month")
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc()
}

/// One event as reported by the upstream feed, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub external_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
}

/// The upstream calendar. Pagination and recurring-event expansion are the
/// provider's problem; implementations return flat instances in the window.
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    async fn events_in(&self, window: &SyncWindow) -> ClubResult<Vec<FeedEvent>>;
}

/// Normalized fields the upsert writes for a synced event.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedEventDraft {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub location: Option<String>,
}

impl From<FeedEvent> for SyncedEventDraft {
    fn from(feed: FeedEvent) -> Self {
        let title = match feed.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => UNTITLED.to_string(),
        };
        SyncedEventDraft {
            external_id: feed.external_id,
            title,
            description: feed.description,
            start: feed.start,
            location: feed.location,
        }
    }
}

/// Outcome of a sync run, echoed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub upserted: usize,
    /// The window the prune step applied to.
    pub deleted_range: SyncWindow,
}

/// Run one full sync pass against the upstream feed.
///
/// Running twice with an unchanged feed yields the same summary and no net
/// row changes: the upsert overwrites rows with identical values and the
/// prune finds nothing to remove.
pub async fn run_sync(
    feed: &dyn CalendarFeed,
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> ClubResult<SyncSummary> {
    let window = SyncWindow::rolling(now);

    let upstream = feed
        .events_in(&window)
        .await
        .map_err(|e| ClubError::Feed(e.to_string()))?;

    let drafts: Vec<SyncedEventDraft> = upstream.into_iter().map(SyncedEventDraft::from).collect();

    if !drafts.is_empty() {
        store.upsert_synced(&drafts).await?;
    }

    // An empty keep list prunes every synced row in the window: the
    // upstream calendar was cleared, so the mirror clears too.
    let keep: Vec<String> = drafts.iter().map(|d| d.external_id.clone()).collect();
    match store.prune_synced(&window, &keep).await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "pruned synced events no longer upstream");
        }
        Ok(_) => {}
        Err(err) => {
            // Non-fatal: fresh data is already in, stale rows linger until
            // the next successful run.
            tracing::warn!(error = %err, "prune step failed after sync");
        }
    }

    Ok(SyncSummary {
        upserted: drafts.len(),
        deleted_range: window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventDraft};
    use crate::store::{EventStore, MemoryStore};
    use chrono::TimeZone;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn feed_event(id: &str, title: &str, start: &str) -> FeedEvent {
        FeedEvent {
            external_id: id.to_string(),
            title: Some(title.to_string()),
            description: None,
            location: None,
            start: EventTime::parse(start).unwrap(),
        }
    }

    struct StubFeed {
        events: Mutex<Vec<FeedEvent>>,
        fail: bool,
    }

    impl StubFeed {
        fn with(events: Vec<FeedEvent>) -> Self {
            StubFeed {
                events: Mutex::new(events),
                fail: false,
            }
        }

        fn set(&self, events: Vec<FeedEvent>) {
            *self.events.lock().unwrap() = events;
        }
    }

    #[async_trait]
    impl CalendarFeed for StubFeed {
        async fn events_in(&self, _window: &SyncWindow) -> ClubResult<Vec<FeedEvent>> {
            if self.fail {
                return Err(ClubError::Feed("upstream quota exceeded".into()));
            }
            Ok(self.events.lock().unwrap().clone())
        }
    }

    async fn synced_ids(store: &MemoryStore) -> Vec<String> {
        let mut ids: Vec<String> = store
            .events_starting_from(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| e.external_id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn rolling_window_is_month_aligned() {
        let window = SyncWindow::rolling(now());
        assert_eq!(window.from, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(window.to, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn untitled_feed_events_get_a_placeholder() {
        let mut event = feed_event("g1", "", "2024-07-01");
        event.title = Some("   ".to_string());
        assert_eq!(SyncedEventDraft::from(event).title, UNTITLED);

        let mut event = feed_event("g1", "", "2024-07-01");
        event.title = None;
        assert_eq!(SyncedEventDraft::from(event).title, UNTITLED);
    }

    #[tokio::test]
    async fn sync_twice_with_unchanged_feed_is_idempotent() {
        let store = MemoryStore::new();
        let feed = StubFeed::with(vec![
            feed_event("g1", "例会", "2024-06-20T19:00:00+09:00"),
            feed_event("g2", "【活動】清掃奉仕", "2024-07-07"),
        ]);

        let first = run_sync(&feed, &store, now()).await.unwrap();
        let events_after_first = store.events_starting_from(first.deleted_range.from).await.unwrap();

        let second = run_sync(&feed, &store, now()).await.unwrap();
        let events_after_second = store.events_starting_from(first.deleted_range.from).await.unwrap();

        assert_eq!(first.upserted, 2);
        assert_eq!(second.upserted, 2);
        assert_eq!(events_after_first, events_after_second);
    }

    #[tokio::test]
    async fn disappeared_upstream_event_is_pruned() {
        let store = MemoryStore::new();
        let feed = StubFeed::with(vec![
            feed_event("g1", "例会", "2024-06-20T19:00:00+09:00"),
            feed_event("g2", "理事会", "2024-06-25T18:00:00+09:00"),
        ]);
        run_sync(&feed, &store, now()).await.unwrap();
        assert_eq!(synced_ids(&store).await, vec!["g1", "g2"]);

        feed.set(vec![feed_event("g2", "理事会", "2024-06-25T18:00:00+09:00")]);
        run_sync(&feed, &store, now()).await.unwrap();
        assert_eq!(synced_ids(&store).await, vec!["g2"]);
    }

    #[tokio::test]
    async fn events_outside_window_survive_prune() {
        let store = MemoryStore::new();
        // Seeded by an earlier sync with a different anchor; starts before
        // the current window
        let feed = StubFeed::with(vec![feed_event("old", "旧例会", "2024-04-10")]);
        run_sync(&feed, &store, Utc.with_ymd_and_hms(2024, 4, 5, 0, 0, 0).unwrap())
            .await
            .unwrap();

        // Current window is [2024-05-01, 2025-06-01); the April event is
        // outside it and must be untouched even though it is gone upstream
        feed.set(vec![]);
        run_sync(&feed, &store, now()).await.unwrap();
        assert_eq!(synced_ids(&store).await, vec!["old"]);
    }

    #[tokio::test]
    async fn empty_upstream_clears_synced_rows_but_not_local_ones() {
        let store = MemoryStore::new();
        let feed = StubFeed::with(vec![feed_event("g1", "例会", "2024-06-20T19:00:00+09:00")]);
        run_sync(&feed, &store, now()).await.unwrap();

        let local = store
            .create_event(EventDraft {
                title: "臨時役員会".to_string(),
                description: None,
                start: EventTime::parse("2024-06-21").unwrap(),
                location: None,
            })
            .await
            .unwrap();

        feed.set(vec![]);
        let summary = run_sync(&feed, &store, now()).await.unwrap();
        assert_eq!(summary.upserted, 0);

        let remaining = store.events_starting_from(summary.deleted_range.from).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, local.id);
        assert_eq!(remaining[0].external_id, None);
    }

    #[tokio::test]
    async fn upsert_overwrites_feed_fields_but_keeps_id_and_attachments() {
        let store = MemoryStore::new();
        let feed = StubFeed::with(vec![feed_event("g1", "例会", "2024-06-20T19:00:00+09:00")]);
        run_sync(&feed, &store, now()).await.unwrap();

        let before = store.events_starting_from(SyncWindow::rolling(now()).from).await.unwrap();
        let id = before[0].id;
        store
            .add_attachment(id, "https://example.com/agenda.pdf".to_string())
            .await
            .unwrap();

        feed.set(vec![feed_event("g1", "例会（変更）", "2024-06-21T19:00:00+09:00")]);
        run_sync(&feed, &store, now()).await.unwrap();

        let after = store.event(id).await.unwrap().unwrap();
        assert_eq!(after.title, "例会（変更）");
        assert_eq!(after.start, EventTime::parse("2024-06-21T19:00:00+09:00").unwrap());
        assert_eq!(after.attachment_urls, vec!["https://example.com/agenda.pdf"]);
    }

    #[tokio::test]
    async fn feed_failure_aborts_without_mutating() {
        let store = MemoryStore::new();
        let seeded = StubFeed::with(vec![feed_event("g1", "例会", "2024-06-20T19:00:00+09:00")]);
        run_sync(&seeded, &store, now()).await.unwrap();

        let failing = StubFeed {
            events: Mutex::new(vec![]),
            fail: true,
        };
        let result = run_sync(&failing, &store, now()).await;
        assert!(matches!(result, Err(ClubError::Feed(_))));
        assert_eq!(synced_ids(&store).await, vec!["g1"]);
    }

    /// EventStore wrapper whose prune step always fails.
    struct BrokenPrune(MemoryStore);

    #[async_trait]
    impl EventStore for BrokenPrune {
        async fn events_starting_from(&self, from: DateTime<Utc>) -> ClubResult<Vec<Event>> {
            self.0.events_starting_from(from).await
        }
        async fn event(&self, id: Uuid) -> ClubResult<Option<Event>> {
            self.0.event(id).await
        }
        async fn create_event(&self, draft: EventDraft) -> ClubResult<Event> {
            self.0.create_event(draft).await
        }
        async fn delete_event(&self, id: Uuid) -> ClubResult<()> {
            self.0.delete_event(id).await
        }
        async fn add_attachment(&self, id: Uuid, url: String) -> ClubResult<Event> {
            self.0.add_attachment(id, url).await
        }
        async fn remove_attachment(&self, id: Uuid, url: &str) -> ClubResult<Event> {
            self.0.remove_attachment(id, url).await
        }
        async fn upsert_synced(&self, drafts: &[SyncedEventDraft]) -> ClubResult<()> {
            self.0.upsert_synced(drafts).await
        }
        async fn prune_synced(&self, _window: &SyncWindow, _keep: &[String]) -> ClubResult<u64> {
            Err(ClubError::Store("delete rejected".into()))
        }
    }

    #[tokio::test]
    async fn prune_failure_does_not_fail_the_sync() {
        let store = BrokenPrune(MemoryStore::new());
        let feed = StubFeed::with(vec![feed_event("g1", "例会", "2024-06-20T19:00:00+09:00")]);

        let summary = run_sync(&feed, &store, now()).await.unwrap();
        assert_eq!(summary.upserted, 1);

        // The upsert phase still landed
        let events = store.events_starting_from(summary.deleted_range.from).await.unwrap();
        assert_eq!(events.len(), 1);
    }
}
