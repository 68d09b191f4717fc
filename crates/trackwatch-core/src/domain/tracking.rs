//! Tracking entities and aggregate counts
//!
//! A [`Tracking`] is a monitored target with a time window and a
//! server-authoritative cumulative counter. [`StatsSummary`] aggregates the
//! active/inactive split over the current set. [`TrackingStats`] and
//! [`HourlyBucket`] are per-tracking detail fetched on demand by the
//! presentation layer; they never enter a reconciliation snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::TrackingId;

// ============================================================================
// Tracking
// ============================================================================

/// A monitored prediction/target entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    /// Stable identifier; the diff keys on this
    pub id: TrackingId,
    /// Human-readable title
    pub title: String,
    /// Whether the tracking window is still open
    pub is_active: bool,
    /// Start of the tracking window
    pub start_date: Option<DateTime<Utc>>,
    /// End of the tracking window
    pub end_date: Option<DateTime<Utc>>,
    /// Server-authoritative cumulative counter
    pub cumulative: i64,
    /// Days left in the window, when the server knows it
    pub days_remaining: Option<i64>,
    /// Link to the related market page
    pub market_link: Option<String>,
}

impl Tracking {
    /// Creates an active tracking with the given id, title and counter
    pub fn new(id: TrackingId, title: impl Into<String>, cumulative: i64) -> Self {
        Self {
            id,
            title: title.into(),
            is_active: true,
            start_date: None,
            end_date: None,
            cumulative,
            days_remaining: None,
            market_link: None,
        }
    }

    /// Sets the active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Sets the tracking window
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }
}

// ============================================================================
// StatsSummary
// ============================================================================

/// Aggregate counts over the current tracking set
///
/// Invariant: `active + inactive == total`. The server computes these; use
/// [`StatsSummary::is_consistent`] to check what it sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

impl StatsSummary {
    /// Creates a summary from explicit counts
    pub const fn new(total: u64, active: u64, inactive: u64) -> Self {
        Self {
            total,
            active,
            inactive,
        }
    }

    /// Computes the summary of a tracking set
    pub fn from_trackings(trackings: &[Tracking]) -> Self {
        let active = trackings.iter().filter(|t| t.is_active).count() as u64;
        let total = trackings.len() as u64;
        Self {
            total,
            active,
            inactive: total - active,
        }
    }

    /// Returns true if `active + inactive == total`
    pub fn is_consistent(&self) -> bool {
        self.active.checked_add(self.inactive) == Some(self.total)
    }
}

// ============================================================================
// TrackingStats / HourlyBucket
// ============================================================================

/// Per-tracking statistics shown in the dashboard table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStats {
    pub cumulative: i64,
    pub total: i64,
    pub percent_complete: i64,
    pub days_total: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub is_complete: bool,
}

/// Count of events in one hour for one tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Start of the hour, already shifted to Beijing time by the server
    pub beijing_date: DateTime<Utc>,
    pub count: i64,
}

// ============================================================================
// StatsFilter
// ============================================================================

/// Which subset of trackings the list view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsFilter {
    All,
    #[default]
    Active,
    Inactive,
}

impl StatsFilter {
    /// Returns the trackings matching this filter, preserving order
    pub fn apply<'a>(&self, trackings: &'a [Tracking]) -> Vec<&'a Tracking> {
        trackings
            .iter()
            .filter(|t| match self {
                StatsFilter::All => true,
                StatsFilter::Active => t.is_active,
                StatsFilter::Inactive => !t.is_active,
            })
            .collect()
    }

    /// The filter the "show all / show active" toggle switches to
    pub fn toggled(&self) -> Self {
        match self {
            StatsFilter::All => StatsFilter::Active,
            StatsFilter::Active | StatsFilter::Inactive => StatsFilter::All,
        }
    }
}

impl std::fmt::Display for StatsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatsFilter::All => "all",
            StatsFilter::Active => "active",
            StatsFilter::Inactive => "inactive",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for StatsFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatsFilter::All),
            "active" => Ok(StatsFilter::Active),
            "inactive" => Ok(StatsFilter::Inactive),
            other => Err(format!(
                "unknown filter '{other}'; valid options: all, active, inactive"
            )),
        }
    }
}

/// Stable sort placing active trackings before inactive ones
pub fn sort_active_first(trackings: &mut [Tracking]) {
    trackings.sort_by_key(|t| !t.is_active);
}
