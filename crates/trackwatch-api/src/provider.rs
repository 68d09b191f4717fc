//! DashboardApiProvider - IDashboardApi implementation over HTTP
//!
//! Wraps the [`DashboardClient`] and normalizes its wire DTOs into domain
//! types to fulfil the [`IDashboardApi`] port contract.
//!
//! ## Design Notes
//!
//! - Normalization defaults live in `trackwatch_core::ports::payload`; this
//!   provider only decides which endpoint feeds which DTO.
//! - A `latest-data` body without `data_changed` is treated as changed
//!   exactly when it carries `data`.

use anyhow::{Context, Result};
use tracing::debug;

use trackwatch_core::domain::{
    HourlyBucket, StatsSummary, Tracking, TrackingId, TrackingStats, UpdateStamp,
};
use trackwatch_core::ports::payload::{normalize_trackings, ServerTime};
use trackwatch_core::ports::{IDashboardApi, LatestData};

use crate::client::DashboardClient;

/// [`IDashboardApi`] adapter backed by a [`DashboardClient`]
#[derive(Debug, Clone)]
pub struct DashboardApiProvider {
    client: DashboardClient,
}

impl DashboardApiProvider {
    /// Creates a new provider wrapping the given client
    pub fn new(client: DashboardClient) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &DashboardClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IDashboardApi for DashboardApiProvider {
    async fn fetch_trackings(&self) -> Result<Vec<Tracking>> {
        let raw = self.client.get_trackings().await?;
        let trackings =
            normalize_trackings(Some(raw)).context("Malformed /api/trackings payload")?;
        debug!(count = trackings.len(), "Fetched trackings");
        Ok(trackings)
    }

    async fn fetch_summary(&self) -> Result<StatsSummary> {
        Ok(self.client.get_summary().await?.normalize())
    }

    async fn fetch_tracking_stats(&self, id: &TrackingId) -> Result<TrackingStats> {
        Ok(self.client.get_tracking_stats(id).await?.normalize())
    }

    async fn fetch_hourly(&self, id: &TrackingId) -> Result<Vec<HourlyBucket>> {
        let buckets = self
            .client
            .get_hourly(id)
            .await?
            .into_iter()
            .map(|raw| raw.normalize())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Malformed hourly data for tracking {id}"))?;
        debug!(tracking = %id.short(), count = buckets.len(), "Fetched hourly buckets");
        Ok(buckets)
    }

    async fn check_updates(&self) -> Result<UpdateStamp> {
        let response = self.client.check_updates().await?;
        let stamp = ServerTime {
            last_update_time: response.last_update_time,
        }
        .stamp()
        .context("Malformed /api/check-updates payload")?;
        Ok(stamp)
    }

    async fn fetch_latest_data(&self) -> Result<LatestData> {
        let response = self.client.latest_data().await?;
        let data_changed = response.data_changed.unwrap_or(response.data.is_some());
        Ok(LatestData {
            data_changed,
            data: response.data,
        })
    }
}
