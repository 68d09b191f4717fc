//! Domain entities
//!
//! This module contains the core domain types for TrackWatch:
//! - Newtypes for tracking identifiers and server timestamps
//! - Tracking entities, summary counts and per-tracking detail
//! - Snapshots and the change records derived from them
//! - Transport state used by the failover machine
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod snapshot;
pub mod tracking;
pub mod transport;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{TrackingId, UpdateStamp};
pub use snapshot::{ChangeRecord, FieldChange, Snapshot, SummaryDelta};
pub use tracking::{
    sort_active_first, HourlyBucket, StatsFilter, StatsSummary, Tracking, TrackingStats,
};
pub use transport::{TransportMode, TransportState};
