//! Test doubles shared by the unit tests of this crate

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use trackwatch_core::domain::{
    HourlyBucket, Snapshot, StatsSummary, Tracking, TrackingId, TrackingStats, TransportState,
    UpdateStamp,
};
use trackwatch_core::ports::payload::{PollData, RawTracking};
use trackwatch_core::ports::{IDashboardApi, IPresentationSink, LatestData, Reconciliation};

// ============================================================================
// RecordingSink
// ============================================================================

/// Presentation sink that records every call
#[derive(Default)]
pub struct RecordingSink {
    reconciled: Mutex<Vec<Reconciliation>>,
    snapshots: Mutex<Vec<Arc<Snapshot>>>,
    statuses: Mutex<Vec<TransportState>>,
}

impl RecordingSink {
    pub fn reconciled_count(&self) -> usize {
        self.reconciled.lock().unwrap().len()
    }

    pub fn last_reconciled(&self) -> Option<Reconciliation> {
        self.reconciled.lock().unwrap().last().cloned()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn statuses(&self) -> Vec<TransportState> {
        self.statuses.lock().unwrap().clone()
    }
}

impl IPresentationSink for RecordingSink {
    fn on_reconciled(&self, reconciliation: &Reconciliation) {
        self.reconciled.lock().unwrap().push(reconciliation.clone());
    }

    fn on_snapshot(&self, snapshot: Arc<Snapshot>) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    fn transport_status(&self, state: TransportState) {
        self.statuses.lock().unwrap().push(state);
    }
}

// ============================================================================
// FakeApi
// ============================================================================

struct FakeState {
    trackings: Vec<Tracking>,
    summary: StatsSummary,
    stamp: f64,
    data_changed: bool,
    failing: bool,
    check_delay: Duration,
    after_trackings: Option<(Vec<Tracking>, f64)>,
}

impl FakeState {
    fn publish(&mut self, trackings: Vec<Tracking>, stamp: f64) {
        self.summary = StatsSummary::from_trackings(&trackings);
        self.trackings = trackings;
        self.stamp = stamp;
        self.data_changed = true;
    }
}

/// In-memory dashboard server
pub struct FakeApi {
    state: Mutex<FakeState>,
    check_calls: AtomicUsize,
    latest_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new(trackings: Vec<Tracking>, stamp: f64) -> Self {
        let summary = StatsSummary::from_trackings(&trackings);
        Self {
            state: Mutex::new(FakeState {
                trackings,
                summary,
                stamp,
                data_changed: true,
                failing: false,
                check_delay: Duration::ZERO,
                after_trackings: None,
            }),
            check_calls: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
        }
    }

    /// Replaces the server data and bumps the update stamp
    pub fn publish(&self, trackings: Vec<Tracking>, stamp: f64) {
        self.state.lock().unwrap().publish(trackings, stamp);
    }

    /// Publishes right after the next `fetch_trackings` has read the old data
    pub fn publish_after_trackings(&self, trackings: Vec<Tracking>, stamp: f64) {
        self.state.lock().unwrap().after_trackings = Some((trackings, stamp));
    }

    /// Delays `check_updates` responses; the stamp is read before the delay
    pub fn set_check_delay(&self, delay: Duration) {
        self.state.lock().unwrap().check_delay = delay;
    }

    pub fn set_data_changed(&self, data_changed: bool) {
        self.state.lock().unwrap().data_changed = data_changed;
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<()> {
        if self.state.lock().unwrap().failing {
            anyhow::bail!("server unavailable");
        }
        Ok(())
    }
}

fn raw(tracking: &Tracking) -> RawTracking {
    RawTracking {
        id: Some(tracking.id.to_string()),
        title: Some(tracking.title.clone()),
        is_active: Some(tracking.is_active),
        cumulative: Some(tracking.cumulative),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl IDashboardApi for FakeApi {
    async fn fetch_trackings(&self) -> Result<Vec<Tracking>> {
        self.guard()?;
        let mut state = self.state.lock().unwrap();
        let trackings = state.trackings.clone();
        if let Some((next, stamp)) = state.after_trackings.take() {
            state.publish(next, stamp);
        }
        Ok(trackings)
    }

    async fn fetch_summary(&self) -> Result<StatsSummary> {
        self.guard()?;
        Ok(self.state.lock().unwrap().summary)
    }

    async fn fetch_tracking_stats(&self, _id: &TrackingId) -> Result<TrackingStats> {
        self.guard()?;
        Ok(TrackingStats::default())
    }

    async fn fetch_hourly(&self, _id: &TrackingId) -> Result<Vec<HourlyBucket>> {
        self.guard()?;
        Ok(Vec::new())
    }

    async fn check_updates(&self) -> Result<UpdateStamp> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.guard()?;
        let (stamp, delay) = {
            let state = self.state.lock().unwrap();
            (state.stamp, state.check_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(UpdateStamp::from_secs(stamp)?)
    }

    async fn fetch_latest_data(&self) -> Result<LatestData> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.guard()?;
        let state = self.state.lock().unwrap();
        if !state.data_changed {
            return Ok(LatestData {
                data_changed: false,
                data: None,
            });
        }
        Ok(LatestData {
            data_changed: true,
            data: Some(PollData {
                trackings: Some(state.trackings.iter().map(raw).collect()),
                last_update: Some(state.stamp + 0.5),
                changes: None,
            }),
        })
    }
}
