//! Change detection
//!
//! [`ChangeDetector::diff`] compares the committed snapshot with an incoming
//! payload and decides what, if anything, is worth telling the user. It is a
//! pure function of its two inputs; the result drives notification only and
//! never decides what gets committed.
//!
//! ## Record source
//!
//! A non-empty server `changes` list is authoritative and used verbatim.
//! When the list is missing or empty the records are computed locally from
//! the per-tracking `cumulative` counters. Missing and empty lists are
//! deliberately treated the same; a server that sends `changes: []` while a
//! counter moved still gets a locally computed record.

use tracing::trace;

use trackwatch_core::domain::{ChangeRecord, Snapshot, SummaryDelta};
use trackwatch_core::ports::NormalizedPayload;

/// Where the change records of a [`DiffResult`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    /// Copied from the payload's `changes` list
    Server,
    /// Computed from the two snapshots' counters
    Local,
    /// No diff was performed (`data_changed: false`)
    Skipped,
}

/// Outcome of comparing a snapshot with an incoming payload
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// Whether the payload is notifiable
    pub changed: bool,
    pub change_records: Vec<ChangeRecord>,
    pub summary_delta: SummaryDelta,
    pub origin: RecordOrigin,
}

impl DiffResult {
    /// Result for a payload the server marked as unchanged
    fn skipped() -> Self {
        Self {
            changed: false,
            change_records: Vec::new(),
            summary_delta: SummaryDelta::default(),
            origin: RecordOrigin::Skipped,
        }
    }

    /// Returns true if any summary field differs
    pub fn summary_changed(&self) -> bool {
        self.summary_delta.is_changed()
    }
}

/// Stateless snapshot/payload differ
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compares `previous` with `incoming` without touching either
    pub fn diff(&self, previous: &Snapshot, incoming: &NormalizedPayload) -> DiffResult {
        if incoming.data_changed == Some(false) {
            trace!("Server marked payload unchanged, skipping diff");
            return DiffResult::skipped();
        }

        let (change_records, origin) = match &incoming.changes {
            Some(changes) if !changes.is_empty() => (changes.clone(), RecordOrigin::Server),
            _ => (Self::local_records(previous, incoming), RecordOrigin::Local),
        };

        let summary_delta = SummaryDelta::between(&previous.summary, &incoming.summary);

        let changed = incoming.data_changed == Some(true)
            || !change_records.is_empty()
            || summary_delta.is_changed();

        trace!(
            changed,
            records = change_records.len(),
            origin = ?origin,
            "Diff computed"
        );

        DiffResult {
            changed,
            change_records,
            summary_delta,
            origin,
        }
    }

    /// One record per tracking that is new or whose counter moved
    ///
    /// A tracking absent from `previous` counts as moving from zero.
    fn local_records(previous: &Snapshot, incoming: &NormalizedPayload) -> Vec<ChangeRecord> {
        incoming
            .trackings
            .iter()
            .filter_map(|tracking| {
                let before = match previous.find(&tracking.id) {
                    Some(old) if old.cumulative == tracking.cumulative => return None,
                    Some(old) => old.cumulative,
                    None => 0,
                };
                Some(ChangeRecord::new(
                    Some(tracking.id.clone()),
                    tracking.title.clone(),
                    before,
                    tracking.cumulative,
                ))
            })
            .collect()
    }
}
