//! Dashboard API port (driven/secondary port)
//!
//! This module defines the interface for the REST side of the dashboard
//! server. The poll transport, the bootstrap load and the presentation
//! layer's detail views all go through it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and the sync engine only needs to know that the cycle failed.
//! - Uses `#[async_trait]` for async trait methods.
//! - Responses with `success: false` are errors, never empty data.

use crate::domain::{HourlyBucket, StatsSummary, Tracking, TrackingId, TrackingStats, UpdateStamp};

use super::payload::PollData;

/// Result of `GET /api/latest-data`
#[derive(Debug, Clone)]
pub struct LatestData {
    /// Server's own "anything new since I last answered" flag
    pub data_changed: bool,
    /// Present when `data_changed` is true
    pub data: Option<PollData>,
}

/// Port trait for the dashboard server's REST endpoints
#[async_trait::async_trait]
pub trait IDashboardApi: Send + Sync {
    /// `GET /api/trackings`
    async fn fetch_trackings(&self) -> anyhow::Result<Vec<Tracking>>;

    /// `GET /api/stats/summary`
    async fn fetch_summary(&self) -> anyhow::Result<StatsSummary>;

    /// `GET /api/trackings/{id}/stats`
    async fn fetch_tracking_stats(&self, id: &TrackingId) -> anyhow::Result<TrackingStats>;

    /// `GET /api/trackings/{id}/hourly`
    async fn fetch_hourly(&self, id: &TrackingId) -> anyhow::Result<Vec<HourlyBucket>>;

    /// `GET /api/check-updates` - the poll heartbeat
    async fn check_updates(&self) -> anyhow::Result<UpdateStamp>;

    /// `GET /api/latest-data` - the poll fallback full fetch
    async fn fetch_latest_data(&self) -> anyhow::Result<LatestData>;
}
