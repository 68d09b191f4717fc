//! Reconciliation engine
//!
//! The [`SyncEngine`] receives every normalized payload, in arrival order,
//! from the session's event loop. For each one it decides between four
//! outcomes:
//!
//! - **Stale**: the payload's timestamp is not strictly newer than the
//!   watermark. Nothing is committed and nothing is notified.
//! - **Baseline**: the first data payload of the session. It is committed
//!   and seeds the watermark but is never notified.
//! - **Silent**: committed, but the diff found nothing worth telling.
//! - **Notified**: committed and handed to the presentation sink.
//!
//! The commit always stores the full incoming payload, whatever the diff
//! says. Handlers take `&mut self`, so two payloads can never be reconciled
//! at the same time.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use trackwatch_core::domain::{Snapshot, UpdateStamp};
use trackwatch_core::ports::{
    IPresentationSink, InboundPayload, NormalizedPayload, PayloadBody, PayloadSource,
    Reconciliation,
};

use crate::detector::ChangeDetector;
use crate::store::SnapshotStore;

// ============================================================================
// ReconcileOutcome
// ============================================================================

/// What the engine did with one payload
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// First committed payload; establishes baseline truth
    Baseline,
    /// Committed and handed to the presentation sink
    Notified(Reconciliation),
    /// Committed without notification
    Silent,
    /// Rejected by the watermark rule
    Stale {
        received: UpdateStamp,
        watermark: UpdateStamp,
    },
    /// "Nothing new" answer that only moved the watermark
    WatermarkAdvanced,
}

impl ReconcileOutcome {
    /// Returns true if the payload was committed to the snapshot store
    pub fn committed(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::Baseline | ReconcileOutcome::Notified(_) | ReconcileOutcome::Silent
        )
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Orchestrates the snapshot store and the change detector
pub struct SyncEngine {
    store: SnapshotStore,
    detector: ChangeDetector,
    sink: Arc<dyn IPresentationSink>,
    /// Highest accepted `last_update_time`
    watermark: Option<UpdateStamp>,
    /// Set once the first data payload has been committed
    has_baseline: bool,
}

impl SyncEngine {
    /// Creates an engine with an empty store
    pub fn new(sink: Arc<dyn IPresentationSink>) -> Self {
        Self {
            store: SnapshotStore::new(),
            detector: ChangeDetector::new(),
            sink,
            watermark: None,
            has_baseline: false,
        }
    }

    /// Highest accepted server timestamp, if any payload was accepted
    pub fn watermark(&self) -> Option<UpdateStamp> {
        self.watermark
    }

    /// Whether the baseline payload has been committed
    pub fn has_baseline(&self) -> bool {
        self.has_baseline
    }

    /// Last committed snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Receiver observing every commit
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.store.subscribe()
    }

    /// Reconciles one inbound payload
    pub fn on_payload(&mut self, inbound: InboundPayload) -> ReconcileOutcome {
        let received = inbound.last_update_time();

        if inbound.source != PayloadSource::Bootstrap {
            if let Some(watermark) = self.watermark {
                if !received.is_newer_than(&watermark) {
                    debug!(
                        source = %inbound.source,
                        %received,
                        %watermark,
                        "Ignoring stale payload"
                    );
                    return ReconcileOutcome::Stale {
                        received,
                        watermark,
                    };
                }
            }
        }

        match inbound.body {
            PayloadBody::Unchanged { .. } => {
                self.advance_watermark(received);
                debug!(source = %inbound.source, %received, "Server reports no new data");
                ReconcileOutcome::WatermarkAdvanced
            }
            PayloadBody::Update(payload) => self.reconcile(inbound.source, payload),
        }
    }

    fn reconcile(&mut self, source: PayloadSource, payload: NormalizedPayload) -> ReconcileOutcome {
        let previous = self.store.current();
        let result = self.detector.diff(&previous, &payload);

        let last_update_time = payload.last_update_time;
        let next = Snapshot::new(payload.trackings, payload.summary, last_update_time);
        self.store.commit(next);
        self.advance_watermark(last_update_time);

        let snapshot = self.store.current();
        self.sink.on_snapshot(snapshot.clone());

        if !self.has_baseline {
            self.has_baseline = true;
            info!(
                %source,
                trackings = snapshot.trackings.len(),
                watermark = %last_update_time,
                "Baseline established"
            );
            return ReconcileOutcome::Baseline;
        }

        if !result.changed {
            debug!(%source, watermark = %last_update_time, "Committed without changes");
            return ReconcileOutcome::Silent;
        }

        info!(
            %source,
            records = result.change_records.len(),
            origin = ?result.origin,
            summary_changed = result.summary_changed(),
            watermark = %last_update_time,
            "Committed notifiable update"
        );

        let reconciliation = Reconciliation {
            snapshot,
            change_records: result.change_records,
            summary_delta: result.summary_delta,
            previous_summary: previous.summary,
            last_update_time,
        };
        self.sink.on_reconciled(&reconciliation);

        ReconcileOutcome::Notified(reconciliation)
    }

    fn advance_watermark(&mut self, stamp: UpdateStamp) {
        self.watermark = Some(match self.watermark {
            Some(current) => current.max(stamp),
            None => stamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use trackwatch_core::domain::{ChangeRecord, StatsSummary, Tracking, TrackingId};

    fn tracking(id: &str, cumulative: i64, active: bool) -> Tracking {
        Tracking::new(TrackingId::new(id).unwrap(), format!("Title {id}"), cumulative)
            .with_active(active)
    }

    fn update(
        source: PayloadSource,
        stamp: f64,
        trackings: Vec<Tracking>,
        summary: StatsSummary,
        data_changed: Option<bool>,
    ) -> InboundPayload {
        InboundPayload::update(
            source,
            NormalizedPayload {
                trackings,
                summary,
                changes: None,
                last_update_time: UpdateStamp::from_secs(stamp).unwrap(),
                data_changed,
            },
        )
    }

    fn engine() -> (SyncEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (SyncEngine::new(sink.clone()), sink)
    }

    #[test]
    fn test_first_payload_is_baseline_and_never_notified() {
        let (mut engine, sink) = engine();

        let outcome = engine.on_payload(update(
            PayloadSource::Push,
            10.0,
            vec![tracking("x", 10, true)],
            StatsSummary::new(1, 1, 0),
            Some(true),
        ));

        assert!(matches!(outcome, ReconcileOutcome::Baseline));
        assert!(engine.has_baseline());
        assert_eq!(engine.watermark().map(|w| w.as_secs()), Some(10.0));
        assert_eq!(sink.reconciled_count(), 0);
        assert_eq!(sink.snapshot_count(), 1);
    }

    #[test]
    fn test_counter_change_notifies_single_record() {
        let (mut engine, sink) = engine();
        let summary = StatsSummary::new(1, 1, 0);

        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            vec![tracking("x", 10, true)],
            summary,
            None,
        ));
        let outcome = engine.on_payload(update(
            PayloadSource::Poll,
            2.0,
            vec![tracking("x", 15, true)],
            summary,
            None,
        ));

        let ReconcileOutcome::Notified(reconciliation) = outcome else {
            panic!("expected notification, got {outcome:?}");
        };
        assert_eq!(reconciliation.change_records.len(), 1);
        assert_eq!(reconciliation.change_records[0].change, 5);
        assert_eq!(sink.reconciled_count(), 1);
        assert_eq!(engine.snapshot().trackings[0].cumulative, 15);
    }

    #[test]
    fn test_redelivery_notifies_at_most_once() {
        let (mut engine, sink) = engine();
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            vec![tracking("x", 10, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        let payload = update(
            PayloadSource::Push,
            2.0,
            vec![tracking("x", 11, true)],
            StatsSummary::new(1, 1, 0),
            Some(true),
        );
        assert!(matches!(
            engine.on_payload(payload.clone()),
            ReconcileOutcome::Notified(_)
        ));
        assert!(matches!(
            engine.on_payload(payload),
            ReconcileOutcome::Stale { .. }
        ));
        assert_eq!(sink.reconciled_count(), 1);
    }

    #[test]
    fn test_poll_with_equal_stamp_is_noop() {
        let (mut engine, sink) = engine();
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            5.0,
            vec![tracking("x", 10, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        let outcome = engine.on_payload(update(
            PayloadSource::Poll,
            5.0,
            vec![tracking("x", 99, true)],
            StatsSummary::new(1, 1, 0),
            Some(true),
        ));

        assert!(matches!(outcome, ReconcileOutcome::Stale { .. }));
        assert!(!outcome.committed());
        assert_eq!(engine.snapshot().trackings[0].cumulative, 10);
        assert_eq!(sink.reconciled_count(), 0);
        assert_eq!(sink.snapshot_count(), 1);
    }

    #[test]
    fn test_out_of_order_poll_loses_to_newer_push() {
        let (mut engine, _sink) = engine();
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            vec![tracking("x", 10, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));
        engine.on_payload(update(
            PayloadSource::Push,
            3.0,
            vec![tracking("x", 30, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        let outcome = engine.on_payload(update(
            PayloadSource::Poll,
            2.0,
            vec![tracking("x", 20, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        assert!(matches!(outcome, ReconcileOutcome::Stale { .. }));
        assert_eq!(engine.snapshot().trackings[0].cumulative, 30);
        assert_eq!(engine.watermark().map(|w| w.as_secs()), Some(3.0));
    }

    #[test]
    fn test_summary_scenario_reports_changed_fields_only() {
        let (mut engine, sink) = engine();
        let trackings = vec![
            tracking("a", 1, true),
            tracking("b", 1, true),
            tracking("c", 1, false),
        ];
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            trackings.clone(),
            StatsSummary::new(3, 2, 1),
            None,
        ));

        let outcome = engine.on_payload(update(
            PayloadSource::Push,
            2.0,
            trackings,
            StatsSummary::new(3, 1, 2),
            Some(true),
        ));

        let ReconcileOutcome::Notified(reconciliation) = outcome else {
            panic!("expected notification");
        };
        let delta = reconciliation.summary_delta;
        assert!(delta.total.is_none());
        assert_eq!(delta.active.map(|f| (f.previous, f.current)), Some((2, 1)));
        assert_eq!(delta.inactive.map(|f| (f.previous, f.current)), Some((1, 2)));
        assert_eq!(reconciliation.previous_summary, StatsSummary::new(3, 2, 1));
        assert_eq!(sink.reconciled_count(), 1);
    }

    #[test]
    fn test_data_changed_false_commits_silently() {
        let (mut engine, sink) = engine();
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            vec![tracking("x", 10, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        let outcome = engine.on_payload(update(
            PayloadSource::Push,
            2.0,
            vec![tracking("x", 12, true)],
            StatsSummary::new(1, 1, 0),
            Some(false),
        ));

        assert!(matches!(outcome, ReconcileOutcome::Silent));
        assert_eq!(engine.snapshot().trackings[0].cumulative, 12);
        assert_eq!(sink.reconciled_count(), 0);
    }

    #[test]
    fn test_unchanged_before_baseline_only_seeds_watermark() {
        let (mut engine, sink) = engine();

        let outcome = engine.on_payload(InboundPayload::unchanged(
            PayloadSource::Poll,
            UpdateStamp::from_secs(4.0).unwrap(),
        ));
        assert!(matches!(outcome, ReconcileOutcome::WatermarkAdvanced));
        assert!(!engine.has_baseline());
        assert!(engine.snapshot().is_empty_sentinel());

        let outcome = engine.on_payload(update(
            PayloadSource::Push,
            5.0,
            vec![tracking("x", 1, true)],
            StatsSummary::new(1, 1, 0),
            Some(true),
        ));
        assert!(matches!(outcome, ReconcileOutcome::Baseline));
        assert_eq!(sink.reconciled_count(), 0);
    }

    #[test]
    fn test_watermark_is_monotonic() {
        let (mut engine, _sink) = engine();
        let mut seen = Vec::new();

        for stamp in [3.0, 1.0, 4.0, 4.0, 2.0, 6.0] {
            engine.on_payload(update(
                PayloadSource::Poll,
                stamp,
                vec![],
                StatsSummary::default(),
                None,
            ));
            seen.push(engine.watermark().map(|w| w.as_secs()).unwrap_or_default());
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(seen.last(), Some(&6.0));
    }

    #[test]
    fn test_server_changes_reach_the_sink() {
        let (mut engine, sink) = engine();
        engine.on_payload(update(
            PayloadSource::Bootstrap,
            1.0,
            vec![tracking("x", 0, true)],
            StatsSummary::new(1, 1, 0),
            None,
        ));

        let payload = InboundPayload::update(
            PayloadSource::Push,
            NormalizedPayload {
                trackings: vec![tracking("x", 0, true)],
                summary: StatsSummary::new(1, 1, 0),
                changes: Some(vec![ChangeRecord::new(None, "Title x", 40, 42)]),
                last_update_time: UpdateStamp::from_secs(2.0).unwrap(),
                data_changed: Some(true),
            },
        );
        engine.on_payload(payload);

        let last = sink.last_reconciled().expect("notified");
        assert_eq!(last.change_records[0].previous_cumulative, 40);
        assert_eq!(last.change_records[0].change, 2);
    }
}
