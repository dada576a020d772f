//! Calendar event types.
//!
//! Events come from two places: the calendar sync engine (rows with a
//! non-null `external_id`, mirrored from the upstream feed) and admins
//! creating club-local entries by hand. The backend stores `start_time`
//! as text because the upstream feed emits either a full timestamp or a
//! bare date for all-day events; [`EventTime::parse`] is the single
//! decode step between that wire shape and the typed model.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder used when the upstream feed delivers an event with no title.
pub const UNTITLED: &str = "(無題)";

/// Leading tag that marks an event as a club activity.
pub const ACTIVITY_TAG: &str = "【活動】";
/// Leading tag that marks an event as a social event.
pub const SOCIAL_TAG: &str = "【イベント】";

/// A club calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// The upstream calendar's id. Non-null means the sync engine owns this
    /// row: it is overwritten on every sync and deleted by the prune step.
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub location: Option<String>,
    /// Ordered list of attached links; append/remove only, never rewritten
    /// by sync.
    #[serde(default)]
    pub attachment_urls: Vec<String>,
}

impl Event {
    /// Classify the event from its leading bracket tag.
    pub fn kind(&self) -> EventKind {
        if self.title.starts_with(ACTIVITY_TAG) {
            EventKind::Activity
        } else if self.title.starts_with(SOCIAL_TAG) {
            EventKind::Social
        } else {
            EventKind::General
        }
    }

    /// Title with any leading `【…】` tag stripped, for display.
    pub fn clean_title(&self) -> &str {
        let t = self.title.as_str();
        if let Some(rest) = t.strip_prefix('【')
            && let Some(end) = rest.find('】')
        {
            return rest[end + '】'.len_utf8()..].trim_start();
        }
        t
    }

    /// The calendar day this event falls on in the club's timezone.
    pub fn local_date(&self, tz: Tz) -> NaiveDate {
        self.start.local_date(tz)
    }
}

/// Event start: either a full timestamp or a bare date (all-day entries,
/// which the upstream feed emits when the event has no explicit end time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Parse the wire representation: RFC 3339 first, then `YYYY-MM-DD`.
    /// Returns `None` for anything else; callers drop such rows from every
    /// view rather than surfacing them.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(EventTime::DateTime(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(EventTime::Date)
    }

    /// Wire representation stored in the backend's `start_time` column.
    pub fn to_wire(&self) -> String {
        match self {
            EventTime::DateTime(dt) => dt.to_rfc3339(),
            EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// The calendar day in the given timezone. Date-only starts are already
    /// club-local days.
    pub fn local_date(&self, tz: Tz) -> NaiveDate {
        match self {
            EventTime::DateTime(dt) => dt.with_timezone(&tz).date_naive(),
            EventTime::Date(d) => *d,
        }
    }

    /// UTC instant used for ordering. Date-only starts sort at local
    /// midnight.
    pub fn sort_key(&self, tz: Tz) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0).expect("midnight is valid");
                tz.from_local_datetime(&midnight)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| midnight.and_utc())
            }
        }
    }

    pub fn is_in(&self, from: DateTime<Utc>, to: DateTime<Utc>, tz: Tz) -> bool {
        let key = self.sort_key(tz);
        key >= from && key < to
    }
}

/// Event classification derived from the title tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Activity,
    Social,
    General,
}

/// Fields an admin supplies when creating a club-local event (no
/// external_id; sync never touches these rows).
#[derive(Debug, Clone, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    fn event(title: &str) -> Event {
        Event {
            id: Uuid::new_v4(),
            external_id: None,
            title: title.to_string(),
            description: None,
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            location: None,
            attachment_urls: vec![],
        }
    }

    #[test]
    fn parses_rfc3339_start() {
        let t = EventTime::parse("2024-06-15T10:00:00+09:00").unwrap();
        assert_eq!(
            t,
            EventTime::DateTime(Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn parses_date_only_start() {
        let t = EventTime::parse("2024-06-15").unwrap();
        assert_eq!(t, EventTime::Date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()));
    }

    #[test]
    fn rejects_garbage_start() {
        assert!(EventTime::parse("").is_none());
        assert!(EventTime::parse("next tuesday").is_none());
        assert!(EventTime::parse("2024/06/15").is_none());
    }

    #[test]
    fn wire_roundtrip() {
        for raw in ["2024-06-15", "2024-06-15T01:00:00+00:00"] {
            let t = EventTime::parse(raw).unwrap();
            assert_eq!(EventTime::parse(&t.to_wire()), Some(t));
        }
    }

    #[test]
    fn local_date_uses_club_timezone() {
        // 23:30 UTC on the 14th is already the 15th in Tokyo
        let t = EventTime::parse("2024-06-14T23:30:00Z").unwrap();
        assert_eq!(
            t.local_date(Tokyo),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
    }

    #[test]
    fn classifies_by_title_tag() {
        assert_eq!(event("【活動】清掃奉仕").kind(), EventKind::Activity);
        assert_eq!(event("【イベント】納涼祭").kind(), EventKind::Social);
        assert_eq!(event("理事会").kind(), EventKind::General);
    }

    #[test]
    fn clean_title_strips_leading_tag() {
        assert_eq!(event("【活動】清掃奉仕").clean_title(), "清掃奉仕");
        assert_eq!(event("【イベント】 納涼祭").clean_title(), "納涼祭");
        assert_eq!(event("理事会").clean_title(), "理事会");
    }
}
