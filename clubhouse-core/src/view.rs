//! View projection for the event dashboard.
//!
//! The whole navigation state (granularity, anchor date, pinned date) is an
//! explicit value object so the projection is pure and testable: same events
//! plus same state always produce the same list. The caller owns the state
//! and hands it in; nothing here mutates shared data.
//!
//! Filter priority: a pinned date (the user tapped a day in the month grid)
//! beats the granularity filter; otherwise events are matched to the same
//! day / week / month as the anchor. Weeks start on Sunday, matching the
//! club's locale.

use chrono::{Datelike, Days, Months, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

/// Serializable navigation state for the dashboard calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub granularity: Granularity,
    pub anchor: NaiveDate,
    /// A single day selected in the month grid; overrides the granularity
    /// filter until cleared.
    pub pinned: Option<NaiveDate>,
}

impl ViewState {
    /// Fresh state: week view anchored on today, nothing pinned.
    pub fn new(today: NaiveDate) -> Self {
        ViewState {
            granularity: Granularity::Week,
            anchor: today,
            pinned: None,
        }
    }

    /// Move the anchor one unit forward. Clears the pinned date.
    pub fn advance(&mut self) {
        self.anchor = shift(self.anchor, self.granularity, 1);
        self.pinned = None;
    }

    /// Move the anchor one unit back. Clears the pinned date.
    pub fn retreat(&mut self) {
        self.anchor = shift(self.anchor, self.granularity, -1);
        self.pinned = None;
    }

    /// Jump back to today. Clears the pinned date.
    pub fn reset_to_today(&mut self, today: NaiveDate) {
        self.anchor = today;
        self.pinned = None;
    }

    /// Switch between day/week/month. Clears the pinned date.
    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.granularity = granularity;
        self.pinned = None;
    }

    pub fn pin(&mut self, date: NaiveDate) {
        self.pinned = Some(date);
    }

    pub fn clear_pin(&mut self) {
        self.pinned = None;
    }

    /// Does a given calendar day fall inside the current view?
    pub fn includes(&self, date: NaiveDate) -> bool {
        if let Some(pinned) = self.pinned {
            return date == pinned;
        }
        match self.granularity {
            Granularity::Day => date == self.anchor,
            Granularity::Week => week_start(date) == week_start(self.anchor),
            Granularity::Month => {
                date.year() == self.anchor.year() && date.month() == self.anchor.month()
            }
        }
    }

    /// Whether today is inside the ambient day/week/month range. Decides if
    /// the UI offers a "jump to today" affordance, so the pinned date is
    /// deliberately ignored here.
    pub fn is_today_in_range(&self, today: NaiveDate) -> bool {
        match self.granularity {
            Granularity::Day => today == self.anchor,
            Granularity::Week => week_start(today) == week_start(self.anchor),
            Granularity::Month => {
                today.year() == self.anchor.year() && today.month() == self.anchor.month()
            }
        }
    }
}

/// Project the full event set into the subset the view should render,
/// ordered by start time ascending.
pub fn project<'a>(events: &'a [Event], state: &ViewState, tz: Tz) -> Vec<&'a Event> {
    let mut selected: Vec<&Event> = events
        .iter()
        .filter(|e| state.includes(e.local_date(tz)))
        .collect();
    selected.sort_by_key(|e| e.start.sort_key(tz));
    selected
}

/// Sunday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_sunday() as u64;
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

fn shift(anchor: NaiveDate, granularity: Granularity, direction: i64) -> NaiveDate {
    let shifted = match granularity {
        Granularity::Day => {
            if direction > 0 {
                anchor.checked_add_days(Days::new(1))
            } else {
                anchor.checked_sub_days(Days::new(1))
            }
        }
        Granularity::Week => {
            if direction > 0 {
                anchor.checked_add_days(Days::new(7))
            } else {
                anchor.checked_sub_days(Days::new(7))
            }
        }
        Granularity::Month => {
            if direction > 0 {
                anchor.checked_add_months(Months::new(1))
            } else {
                anchor.checked_sub_months(Months::new(1))
            }
        }
    };
    shifted.unwrap_or(anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use chrono_tz::Asia::Tokyo;
    use uuid::Uuid;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event_on(raw: &str) -> Event {
        Event {
            id: Uuid::new_v4(),
            external_id: None,
            title: format!("event {raw}"),
            description: None,
            start: EventTime::parse(raw).unwrap(),
            location: None,
            attachment_urls: vec![],
        }
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-06-15 is a Saturday; its week runs 06-09 .. 06-15
        assert_eq!(week_start(ymd(2024, 6, 15)), ymd(2024, 6, 9));
        assert_eq!(week_start(ymd(2024, 6, 9)), ymd(2024, 6, 9));
        assert_eq!(week_start(ymd(2024, 6, 16)), ymd(2024, 6, 16));
    }

    #[test]
    fn week_view_selects_sunday_through_saturday() {
        let events = vec![
            event_on("2024-06-08"),             // Saturday before: out
            event_on("2024-06-09T00:00:00+09:00"), // Sunday 00:00: in
            event_on("2024-06-12T19:00:00+09:00"), // midweek: in
            event_on("2024-06-15T23:30:00+09:00"), // Saturday night: in
            event_on("2024-06-16"),             // next Sunday: out
        ];
        let state = ViewState {
            granularity: Granularity::Week,
            anchor: ymd(2024, 6, 15),
            pinned: None,
        };
        let shown = project(&events, &state, Tokyo);
        let days: Vec<NaiveDate> = shown.iter().map(|e| e.local_date(Tokyo)).collect();
        assert_eq!(days, vec![ymd(2024, 6, 9), ymd(2024, 6, 12), ymd(2024, 6, 15)]);
    }

    #[test]
    fn pinned_date_overrides_month_filter() {
        let events = vec![
            event_on("2024-06-03T10:00:00+09:00"),
            event_on("2024-06-03"),
            event_on("2024-06-10T10:00:00+09:00"),
            event_on("2024-06-20"),
        ];
        let mut state = ViewState {
            granularity: Granularity::Month,
            anchor: ymd(2024, 6, 15),
            pinned: None,
        };
        assert_eq!(project(&events, &state, Tokyo).len(), 4);

        state.pin(ymd(2024, 6, 3));
        let shown = project(&events, &state, Tokyo);
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|e| e.local_date(Tokyo) == ymd(2024, 6, 3)));

        state.clear_pin();
        assert_eq!(project(&events, &state, Tokyo).len(), 4);
    }

    #[test]
    fn projection_sorts_by_start_ascending() {
        let events = vec![
            event_on("2024-06-12T19:00:00+09:00"),
            event_on("2024-06-10T09:00:00+09:00"),
            event_on("2024-06-11"),
        ];
        let state = ViewState {
            granularity: Granularity::Week,
            anchor: ymd(2024, 6, 12),
            pinned: None,
        };
        let shown = project(&events, &state, Tokyo);
        let days: Vec<NaiveDate> = shown.iter().map(|e| e.local_date(Tokyo)).collect();
        assert_eq!(days, vec![ymd(2024, 6, 10), ymd(2024, 6, 11), ymd(2024, 6, 12)]);
    }

    #[test]
    fn navigation_clears_pin_and_shifts_anchor() {
        let mut state = ViewState::new(ymd(2024, 6, 15));
        state.pin(ymd(2024, 6, 3));

        state.advance();
        assert_eq!(state.anchor, ymd(2024, 6, 22));
        assert_eq!(state.pinned, None);

        state.set_granularity(Granularity::Month);
        state.advance();
        assert_eq!(state.anchor, ymd(2024, 7, 22));
        state.retreat();
        state.retreat();
        assert_eq!(state.anchor, ymd(2024, 5, 22));

        state.set_granularity(Granularity::Day);
        state.retreat();
        assert_eq!(state.anchor, ymd(2024, 5, 21));
    }

    #[test]
    fn month_shift_clamps_end_of_month() {
        let mut state = ViewState {
            granularity: Granularity::Month,
            anchor: ymd(2024, 1, 31),
            pinned: None,
        };
        state.advance();
        assert_eq!(state.anchor, ymd(2024, 2, 29));
    }

    #[test]
    fn today_in_range_ignores_pin() {
        let today = ymd(2024, 6, 11);
        let mut state = ViewState {
            granularity: Granularity::Week,
            anchor: ymd(2024, 6, 15),
            pinned: None,
        };
        assert!(state.is_today_in_range(today));
        state.pin(ymd(2024, 6, 3));
        assert!(state.is_today_in_range(today));

        state.set_granularity(Granularity::Day);
        assert!(!state.is_today_in_range(today));

        state.reset_to_today(today);
        assert!(state.is_today_in_range(today));
    }
}
