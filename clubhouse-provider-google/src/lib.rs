//! Google Calendar feed provider.
//!
//! Reads a public club calendar through the Calendar v3 REST API with an
//! API key (the calendar is shared read-only; no OAuth involved) and maps
//! the items into the core's provider-neutral [`FeedEvent`]s. Recurring
//! events are expanded by the API (`singleEvents=true`), so the sync engine
//! only ever sees flat instances.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use url::Url;

use clubhouse_core::error::{ClubError, ClubResult};
use clubhouse_core::event::EventTime;
use clubhouse_core::sync::{CalendarFeed, FeedEvent, SyncWindow};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

pub struct GoogleCalendarFeed {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    api_key: String,
}

impl GoogleCalendarFeed {
    pub fn new(calendar_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        GoogleCalendarFeed {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            calendar_id: calendar_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn events_url(&self, window: &SyncWindow, page_token: Option<&str>) -> ClubResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/calendars/{}/events",
            self.base_url, self.calendar_id
        ))
        .map_err(|e| ClubError::Feed(format!("bad calendar URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("timeMin", &window.from.to_rfc3339())
            .append_pair("timeMax", &window.to.to_rfc3339())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }
        Ok(url)
    }
}

#[async_trait]
impl CalendarFeed for GoogleCalendarFeed {
    async fn events_in(&self, window: &SyncWindow) -> ClubResult<Vec<FeedEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.events_url(window, page_token.as_deref())?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ClubError::Feed(format!("calendar request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response
                    .json::<ApiErrorEnvelope>()
                    .await
                    .map(|e| e.error.message)
                    .unwrap_or_else(|_| "(no detail)".to_string());
                return Err(ClubError::Feed(format!(
                    "calendar API returned {status}: {detail}"
                )));
            }

            let page: EventsPage = response
                .json()
                .await
                .map_err(|e| ClubError::Feed(format!("malformed calendar response: {e}")))?;

            events.extend(page.items.into_iter().filter_map(to_feed_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = events.len(), "fetched upstream calendar events");
        Ok(events)
    }
}

/// Map one API item into the neutral feed shape. Cancelled items, items
/// without an id and items without a usable start are dropped.
fn to_feed_event(item: GoogleEvent) -> Option<FeedEvent> {
    if item.status.as_deref() == Some("cancelled") {
        return None;
    }
    let external_id = item.id.filter(|id| !id.is_empty())?;
    let start = item.start?;
    let start = match (start.date_time, start.date) {
        (Some(dt), _) => EventTime::DateTime(dt.with_timezone(&Utc)),
        (None, Some(d)) => EventTime::Date(d),
        (None, None) => return None,
    };

    Some(FeedEvent {
        external_id,
        title: item.summary.filter(|s| !s.is_empty()),
        description: item.description.filter(|s| !s.is_empty()),
        location: item.location.filter(|s| !s.is_empty()),
        start,
    })
}

// ---- wire types (Calendar v3) ----

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventTime>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<chrono::FixedOffset>>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
