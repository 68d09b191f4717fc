//! Snapshots and derived change records
//!
//! A [`Snapshot`] is the client-side copy of the server's tracking set. It is
//! created empty when a session starts and replaced wholesale on every
//! committed update; nothing ever mutates one in place.
//!
//! [`ChangeRecord`] and [`SummaryDelta`] are derived values computed while
//! reconciling two snapshots. They are never stored.

use serde::{Deserialize, Serialize};

use super::newtypes::{TrackingId, UpdateStamp};
use super::tracking::{StatsSummary, Tracking};

// ============================================================================
// Snapshot
// ============================================================================

/// The last-known client-side copy of the tracking set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Trackings in server order
    pub trackings: Vec<Tracking>,
    /// Aggregate counts as reported by the server
    pub summary: StatsSummary,
    /// Server timestamp of the data; `None` only for the empty sentinel
    pub last_update_time: Option<UpdateStamp>,
}

impl Snapshot {
    /// The empty sentinel returned before the first commit
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a snapshot from committed payload data
    pub fn new(
        trackings: Vec<Tracking>,
        summary: StatsSummary,
        last_update_time: UpdateStamp,
    ) -> Self {
        Self {
            trackings,
            summary,
            last_update_time: Some(last_update_time),
        }
    }

    /// Returns true for the pre-first-update sentinel
    pub fn is_empty_sentinel(&self) -> bool {
        self.last_update_time.is_none() && self.trackings.is_empty()
    }

    /// Finds a tracking by id
    pub fn find(&self, id: &TrackingId) -> Option<&Tracking> {
        self.trackings.iter().find(|t| &t.id == id)
    }
}

// ============================================================================
// ChangeRecord
// ============================================================================

/// One tracking whose cumulative counter moved between snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Tracking the change belongs to, when the producer supplied it
    pub tracking_id: Option<TrackingId>,
    pub title: String,
    pub previous_cumulative: i64,
    pub current_cumulative: i64,
    /// `current_cumulative - previous_cumulative`
    pub change: i64,
}

impl ChangeRecord {
    /// Builds a record, deriving `change` from the two counters
    pub fn new(
        tracking_id: Option<TrackingId>,
        title: impl Into<String>,
        previous_cumulative: i64,
        current_cumulative: i64,
    ) -> Self {
        Self {
            tracking_id,
            title: title.into(),
            previous_cumulative,
            current_cumulative,
            change: current_cumulative.saturating_sub(previous_cumulative),
        }
    }

    /// Signed delta formatted with an explicit `+` for growth
    pub fn signed_change(&self) -> String {
        if self.change > 0 {
            format!("+{}", self.change)
        } else {
            self.change.to_string()
        }
    }
}

// ============================================================================
// SummaryDelta
// ============================================================================

/// Old and new value of one summary field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub previous: u64,
    pub current: u64,
}

/// Field-by-field difference of two summaries; unchanged fields are `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDelta {
    pub total: Option<FieldChange>,
    pub active: Option<FieldChange>,
    pub inactive: Option<FieldChange>,
}

impl SummaryDelta {
    /// Compares two summaries field by field
    pub fn between(previous: &StatsSummary, current: &StatsSummary) -> Self {
        fn field(previous: u64, current: u64) -> Option<FieldChange> {
            (previous != current).then_some(FieldChange { previous, current })
        }

        Self {
            total: field(previous.total, current.total),
            active: field(previous.active, current.active),
            inactive: field(previous.inactive, current.inactive),
        }
    }

    /// Returns true if any field differs
    pub fn is_changed(&self) -> bool {
        self.total.is_some() || self.active.is_some() || self.inactive.is_some()
    }
}
