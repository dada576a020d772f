//! Attendance ledger: one RSVP per (event, member) pair.
//!
//! "pending" is the default state of every pair; a row only exists once a
//! member (or an admin on their behalf) has answered at least once. The
//! backend enforces uniqueness via the (event_id, user_id) conflict key,
//! so repeated writes are last-write-wins and never duplicate rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClubResult;
use crate::store::AttendanceStore;

/// Tri-state RSVP. Wire values match the backend's status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "attendance")]
    Attending,
    #[serde(rename = "absence")]
    Absent,
    #[serde(rename = "pending")]
    Pending,
}

/// One answer for one (event, member) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: AttendanceStatus,
    pub updated_at: DateTime<Utc>,
}

/// Per-event aggregate, derived from records rather than stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceCounts {
    pub attending: usize,
    pub absent: usize,
}

impl AttendanceCounts {
    /// Members who have given a definitive answer either way.
    pub fn responded(&self) -> usize {
        self.attending + self.absent
    }
}

/// Count definitive answers in a set of records for one event.
pub fn count_by_status(records: &[AttendanceRecord]) -> AttendanceCounts {
    let mut counts = AttendanceCounts::default();
    for record in records {
        match record.status {
            AttendanceStatus::Attending => counts.attending += 1,
            AttendanceStatus::Absent => counts.absent += 1,
            AttendanceStatus::Pending => {}
        }
    }
    counts
}

/// Upsert-only mutation API over an [`AttendanceStore`].
pub struct AttendanceLedger<'a, S: AttendanceStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: AttendanceStore + ?Sized> AttendanceLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        AttendanceLedger { store }
    }

    /// Record an answer. Returns `false` when the write was skipped because
    /// the stored status already matches (skipping is an optimization only;
    /// the upsert itself is idempotent). An explicit "pending" answer is
    /// always written so the row keeps its updated_at stamp.
    pub async fn set_status(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> ClubResult<bool> {
        if status != AttendanceStatus::Pending
            && let Some(current) = self.store.status_of(event_id, user_id).await?
            && current == status
        {
            return Ok(false);
        }

        self.store
            .set_status(event_id, user_id, status, now)
            .await?;
        Ok(true)
    }

    /// Delete the row entirely, reverting the pair to implicit "pending".
    /// Admin-only; routes enforce that.
    pub async fn clear_status(&self, event_id: Uuid, user_id: Uuid) -> ClubResult<()> {
        self.store.clear_status(event_id, user_id).await
    }

    /// Aggregate counts for one event.
    pub async fn counts_for(&self, event_id: Uuid) -> ClubResult<AttendanceCounts> {
        let records = self.store.for_event(event_id).await?;
        Ok(count_by_status(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counts_ignore_explicit_pending_rows() {
        let records = vec![
            record(AttendanceStatus::Attending),
            record(AttendanceStatus::Attending),
            record(AttendanceStatus::Absent),
            record(AttendanceStatus::Pending),
        ];
        let counts = count_by_status(&records);
        assert_eq!(counts.attending, 2);
        assert_eq!(counts.absent, 1);
        assert_eq!(counts.responded(), 3);
    }

    #[test]
    fn wire_status_names() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Attending).unwrap(),
            "\"attendance\""
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Absent).unwrap(),
            "\"absence\""
        );
        assert_eq!(
            serde_json::from_str::<AttendanceStatus>("\"pending\"").unwrap(),
            AttendanceStatus::Pending
        );
    }
}
