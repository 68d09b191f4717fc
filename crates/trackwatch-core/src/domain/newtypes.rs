//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for tracking identifiers and
//! server-supplied update timestamps. Each newtype ensures data validity at
//! construction time.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// TrackingId
// ============================================================================

/// Opaque, stable identifier of a tracking entity
///
/// The server assigns these; the client never interprets them beyond
/// equality. The diff algorithm keys on this value, so it must be identical
/// across snapshots for the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Create a new TrackingId, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidTrackingId(id));
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in compact listings (first 8 characters)
    #[must_use]
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Display for TrackingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackingId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TrackingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// UpdateStamp
// ============================================================================

/// Server-supplied "last update" instant, in fractional Unix seconds
///
/// The server reports these as floating point seconds. Values are always
/// finite, which makes the partial order total in practice; the watermark
/// comparison in the sync engine relies on that.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateStamp(f64);

impl UpdateStamp {
    /// Create a stamp from Unix seconds, rejecting NaN and infinities
    pub fn from_secs(secs: f64) -> Result<Self, DomainError> {
        if !secs.is_finite() {
            return Err(DomainError::InvalidTimestamp(secs.to_string()));
        }
        Ok(Self(secs))
    }

    /// The zero stamp (Unix epoch)
    #[must_use]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Unix seconds
    #[must_use]
    pub const fn as_secs(&self) -> f64 {
        self.0
    }

    /// Whether this stamp is strictly newer than `other`
    #[must_use]
    pub fn is_newer_than(&self, other: &UpdateStamp) -> bool {
        self.0.partial_cmp(&other.0) == Some(Ordering::Greater)
    }

    /// The later of two stamps
    #[must_use]
    pub fn max(self, other: UpdateStamp) -> UpdateStamp {
        if other.is_newer_than(&self) {
            other
        } else {
            self
        }
    }

    /// Convert to a UTC datetime (millisecond precision)
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.0 * 1000.0).round() as i64)
    }
}

impl Display for UpdateStamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<DateTime<Utc>> for UpdateStamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis() as f64 / 1000.0)
    }
}
