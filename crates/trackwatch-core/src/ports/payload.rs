//! Port-level wire DTOs and normalization
//!
//! The push channel and the REST endpoints deliver slightly different
//! shapes. Every field of the raw DTOs here is optional; the `normalize`
//! methods apply one documented default per field and turn the result into
//! domain types, so the sync engine only ever sees a [`NormalizedPayload`].
//!
//! ## Field defaults
//!
//! | Field | Missing value |
//! |-------|---------------|
//! | numeric counters, summary counts | `0` |
//! | change `change` | `current - previous` |
//! | `changes` list | `None` (distinct from an empty list) |
//! | tracking `title` / change `title` | `"Unknown"` |
//! | `isActive` | `false` |
//! | dates (missing or not RFC 3339) | `None` |
//! | tracking `id`, `trackings`, push `last_update` | malformed payload |
//! | push `summary` | recomputed from the trackings |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChangeRecord, DomainError, HourlyBucket, StatsSummary, Tracking, TrackingId, TrackingStats,
    UpdateStamp,
};

/// Title used when the server omits one
pub const UNKNOWN_TITLE: &str = "Unknown";

// ============================================================================
// Normalized payload (what the sync engine consumes)
// ============================================================================

/// Transport-agnostic update handed to the sync engine
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub trackings: Vec<Tracking>,
    pub summary: StatsSummary,
    /// Server-computed change list; `None` when the server sent none
    pub changes: Option<Vec<ChangeRecord>>,
    pub last_update_time: UpdateStamp,
    /// Server hint; `Some(false)` short-circuits change detection
    pub data_changed: Option<bool>,
}

/// Where an inbound payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Initial REST load at session start
    Bootstrap,
    /// Push channel `data_update`
    Push,
    /// REST fetch triggered by a poll tick or a push heartbeat
    Poll,
}

impl std::fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PayloadSource::Bootstrap => "bootstrap",
            PayloadSource::Push => "push",
            PayloadSource::Poll => "poll",
        };
        write!(f, "{}", s)
    }
}

/// Body of an inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    /// Full data to reconcile and commit
    Update(NormalizedPayload),
    /// The server has nothing new; only the watermark may advance
    Unchanged { last_update_time: UpdateStamp },
}

/// A payload plus its source, as queued for the sync engine
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPayload {
    pub source: PayloadSource,
    pub body: PayloadBody,
}

impl InboundPayload {
    /// Wraps a full update
    pub fn update(source: PayloadSource, payload: NormalizedPayload) -> Self {
        Self {
            source,
            body: PayloadBody::Update(payload),
        }
    }

    /// Wraps a "nothing new" answer
    pub fn unchanged(source: PayloadSource, last_update_time: UpdateStamp) -> Self {
        Self {
            source,
            body: PayloadBody::Unchanged { last_update_time },
        }
    }

    /// Server timestamp carried by this payload
    pub fn last_update_time(&self) -> UpdateStamp {
        match &self.body {
            PayloadBody::Update(p) => p.last_update_time,
            PayloadBody::Unchanged { last_update_time } => *last_update_time,
        }
    }
}

// ============================================================================
// Raw wire DTOs
// ============================================================================

/// Tracking as serialized by the server (camelCase keys)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTracking {
    pub id: Option<String>,
    pub title: Option<String>,
    pub is_active: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub cumulative: Option<i64>,
    pub days_remaining: Option<i64>,
    pub market_link: Option<String>,
}

/// Summary counts as serialized by the server
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawSummary {
    pub total: Option<u64>,
    pub active: Option<u64>,
    pub inactive: Option<u64>,
}

/// Server-computed change entry (snake_case keys)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawChange {
    pub tracking_id: Option<String>,
    pub title: Option<String>,
    pub previous_cumulative: Option<i64>,
    pub current_cumulative: Option<i64>,
    pub change: Option<i64>,
}

/// Push channel `data_update` event body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushUpdate {
    pub data_changed: Option<bool>,
    pub trackings: Option<Vec<RawTracking>>,
    pub summary: Option<RawSummary>,
    pub last_update: Option<f64>,
    pub changes: Option<Vec<RawChange>>,
}

/// Push channel `server_time` event body, also the check-updates heartbeat
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ServerTime {
    pub last_update_time: Option<f64>,
}

/// `data` object of `GET /api/latest-data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollData {
    pub trackings: Option<Vec<RawTracking>>,
    pub last_update: Option<f64>,
    pub changes: Option<Vec<RawChange>>,
}

/// Per-tracking stats as serialized by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrackingStats {
    pub cumulative: Option<i64>,
    pub total: Option<i64>,
    pub percent_complete: Option<i64>,
    pub days_total: Option<i64>,
    pub days_elapsed: Option<i64>,
    pub days_remaining: Option<i64>,
    pub is_complete: Option<bool>,
}

/// Hourly bucket as serialized by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHourlyBucket {
    pub beijing_date: Option<String>,
    pub count: Option<i64>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Parses an instant sent by the server
///
/// Accepts RFC 3339 and offset-less ISO 8601 (treated as UTC), which is
/// what the server's storage layer emits for naive datetimes.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn stamp(value: Option<f64>, field: &str) -> Result<UpdateStamp, DomainError> {
    let secs = value.ok_or_else(|| DomainError::MalformedPayload(format!("missing {field}")))?;
    UpdateStamp::from_secs(secs)
}

impl RawTracking {
    /// Converts into a domain [`Tracking`]; fails only when `id` is unusable
    pub fn normalize(self) -> Result<Tracking, DomainError> {
        let id = self
            .id
            .ok_or_else(|| DomainError::MalformedPayload("tracking without id".to_string()))?;

        Ok(Tracking {
            id: TrackingId::new(id)?,
            title: self.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            is_active: self.is_active.unwrap_or(false),
            start_date: self.start_date.as_deref().and_then(parse_instant),
            end_date: self.end_date.as_deref().and_then(parse_instant),
            cumulative: self.cumulative.unwrap_or(0),
            days_remaining: self.days_remaining,
            market_link: self.market_link,
        })
    }
}

/// Normalizes a tracking list; a missing list is a malformed payload
pub fn normalize_trackings(raw: Option<Vec<RawTracking>>) -> Result<Vec<Tracking>, DomainError> {
    raw.ok_or_else(|| DomainError::MalformedPayload("missing trackings".to_string()))?
        .into_iter()
        .map(RawTracking::normalize)
        .collect()
}

impl RawSummary {
    /// Converts into a domain [`StatsSummary`], defaulting counts to zero
    pub fn normalize(self) -> StatsSummary {
        StatsSummary {
            total: self.total.unwrap_or(0),
            active: self.active.unwrap_or(0),
            inactive: self.inactive.unwrap_or(0),
        }
    }
}

impl RawChange {
    /// Converts into a [`ChangeRecord`]
    ///
    /// A server-supplied `change` is kept as-is; it is only recomputed when
    /// missing.
    pub fn normalize(self) -> ChangeRecord {
        let previous = self.previous_cumulative.unwrap_or(0);
        let current = self.current_cumulative.unwrap_or(0);
        let mut record = ChangeRecord::new(
            self.tracking_id.and_then(|id| TrackingId::new(id).ok()),
            self.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            previous,
            current,
        );
        if let Some(change) = self.change {
            record.change = change;
        }
        record
    }
}

fn normalize_changes(raw: Option<Vec<RawChange>>) -> Option<Vec<ChangeRecord>> {
    raw.map(|changes| changes.into_iter().map(RawChange::normalize).collect())
}

impl PushUpdate {
    /// Normalizes a push `data_update` event
    pub fn normalize(self) -> Result<NormalizedPayload, DomainError> {
        let last_update_time = stamp(self.last_update, "last_update")?;
        let trackings = normalize_trackings(self.trackings)?;
        let summary = match self.summary {
            Some(raw) => raw.normalize(),
            None => StatsSummary::from_trackings(&trackings),
        };

        Ok(NormalizedPayload {
            trackings,
            summary,
            changes: normalize_changes(self.changes),
            last_update_time,
            data_changed: self.data_changed,
        })
    }
}

impl ServerTime {
    /// Extracts the heartbeat timestamp
    pub fn stamp(&self) -> Result<UpdateStamp, DomainError> {
        stamp(self.last_update_time, "last_update_time")
    }
}

impl PollData {
    /// Normalizes a latest-data body together with the separately fetched
    /// summary
    ///
    /// `heartbeat` is the check-updates timestamp that triggered the fetch;
    /// it becomes the payload's `last_update_time` so the watermark stays on
    /// the server's update clock. The body's own `last_update` is the time
    /// the response was generated and is only used when no heartbeat exists.
    pub fn normalize(
        self,
        summary: StatsSummary,
        heartbeat: Option<UpdateStamp>,
    ) -> Result<NormalizedPayload, DomainError> {
        let last_update_time = match heartbeat {
            Some(stamp) => stamp,
            None => stamp(self.last_update, "last_update")?,
        };

        Ok(NormalizedPayload {
            trackings: normalize_trackings(self.trackings)?,
            summary,
            changes: normalize_changes(self.changes),
            last_update_time,
            data_changed: Some(true),
        })
    }
}

impl RawTrackingStats {
    /// Converts into [`TrackingStats`], defaulting every number to zero
    pub fn normalize(self) -> TrackingStats {
        TrackingStats {
            cumulative: self.cumulative.unwrap_or(0),
            total: self.total.unwrap_or(0),
            percent_complete: self.percent_complete.unwrap_or(0),
            days_total: self.days_total.unwrap_or(0),
            days_elapsed: self.days_elapsed.unwrap_or(0),
            days_remaining: self.days_remaining.unwrap_or(0),
            is_complete: self.is_complete.unwrap_or(false),
        }
    }
}

impl RawHourlyBucket {
    /// Converts into an [`HourlyBucket`]; the date is required
    pub fn normalize(self) -> Result<HourlyBucket, DomainError> {
        let raw_date = self
            .beijing_date
            .ok_or_else(|| DomainError::MalformedPayload("hourly bucket without date".into()))?;
        let beijing_date = parse_instant(&raw_date).ok_or_else(|| {
            DomainError::MalformedPayload(format!("unparseable hourly date: {raw_date}"))
        })?;

        Ok(HourlyBucket {
            beijing_date,
            count: self.count.unwrap_or(0),
        })
    }
}
