//! Presentation port (driving side of the view)
//!
//! Charts, tables, countdowns and voice playback live outside the sync
//! engine. They receive already-reconciled data through
//! [`IPresentationSink`] and never feed anything back into reconciliation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChangeRecord, Snapshot, StatsSummary, SummaryDelta, TransportState, UpdateStamp,
};

/// A notifiable reconciliation handed to presentation consumers
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Snapshot that was just committed
    pub snapshot: Arc<Snapshot>,
    /// Per-tracking counter changes, possibly empty
    pub change_records: Vec<ChangeRecord>,
    /// Field-by-field summary difference
    pub summary_delta: SummaryDelta,
    /// Summary of the replaced snapshot
    pub previous_summary: StatsSummary,
    /// Server timestamp of the committed data
    pub last_update_time: UpdateStamp,
}

/// A rendered change-feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub lines: Vec<String>,
    /// When the entry was produced locally
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates a notification stamped with the current time
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            created_at: Utc::now(),
        }
    }

    /// Renders title and lines as a multi-line block
    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str("  ");
            out.push_str(line);
        }
        out
    }
}

/// Port trait for view consumers
///
/// Methods are synchronous and called from the session's event loop; an
/// implementation that needs to do I/O should hand the data off rather than
/// block.
pub trait IPresentationSink: Send + Sync {
    /// Called once per notifiable reconciliation
    fn on_reconciled(&self, reconciliation: &Reconciliation);

    /// Called after every commit, notifiable or not, including the baseline
    fn on_snapshot(&self, _snapshot: Arc<Snapshot>) {}

    /// Called whenever the transport mode or connectivity changes
    fn transport_status(&self, state: TransportState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_indents_lines() {
        let notification = Notification::new(
            "Data updated",
            vec!["first".to_string(), "second".to_string()],
        );
        assert_eq!(notification.render(), "Data updated\n  first\n  second");
    }

    #[test]
    fn test_render_without_lines() {
        let notification = Notification::new("Data updated", vec![]);
        assert_eq!(notification.render(), "Data updated");
    }
}
