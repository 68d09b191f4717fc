//! Change feed
//!
//! [`NotificationQueue`] turns notifiable reconciliations into short
//! human-readable [`Notification`]s, keeps the most recent ones for display
//! and hands each one out exactly once for an audible announcement.
//!
//! A rendered entry looks like:
//!
//! ```text
//! Data updated
//!   Updated at: 2026-01-15 18:00:03
//!   Posts from Jan 10 to Jan 17: 118 → 120 (+2)
//!   Active trackings: 2 → 1
//!   Completed trackings: 1 → 2
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::Local;

use trackwatch_core::config::NotificationsConfig;
use trackwatch_core::domain::{FieldChange, SummaryDelta};
use trackwatch_core::ports::{Notification, Reconciliation};

/// Shown when a reconciliation carries no per-line detail
pub const NO_DETAIL_MESSAGE: &str = "Data updated, but summary metrics are unchanged";

/// Builds the notification for one reconciliation
pub fn render_reconciliation(title: &str, reconciliation: &Reconciliation) -> Notification {
    let mut lines = Vec::new();

    let updated_at = reconciliation
        .last_update_time
        .to_datetime()
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| reconciliation.last_update_time.to_string());
    lines.push(format!("Updated at: {updated_at}"));

    let mut detail = 0;

    for record in &reconciliation.change_records {
        lines.push(format!(
            "{}: {} → {} ({})",
            record.title,
            record.previous_cumulative,
            record.current_cumulative,
            record.signed_change()
        ));
        detail += 1;
    }

    for (label, change) in summary_lines(&reconciliation.summary_delta) {
        lines.push(format!("{label}: {} → {}", change.previous, change.current));
        detail += 1;
    }

    if detail == 0 {
        lines.push(NO_DETAIL_MESSAGE.to_string());
    }

    Notification::new(title, lines)
}

fn summary_lines(delta: &SummaryDelta) -> impl Iterator<Item = (&'static str, FieldChange)> {
    [
        ("Total trackings", delta.total),
        ("Active trackings", delta.active),
        ("Completed trackings", delta.inactive),
    ]
    .into_iter()
    .filter_map(|(label, change)| change.map(|c| (label, c)))
}

// ============================================================================
// NotificationQueue
// ============================================================================

#[derive(Debug)]
struct Entry {
    notification: Notification,
    shown_at: Instant,
    announced: bool,
}

/// Bounded queue of recent change notifications
#[derive(Debug)]
pub struct NotificationQueue {
    title: String,
    capacity: usize,
    display: Duration,
    entries: VecDeque<Entry>,
}

impl NotificationQueue {
    /// Creates an empty queue
    ///
    /// A zero capacity is treated as one.
    pub fn new(title: impl Into<String>, capacity: usize, display: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            title: title.into(),
            capacity,
            display,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Creates a queue from the `notifications` configuration section
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self::new(
            config.alert_message.clone(),
            config.capacity,
            config.display_duration(),
        )
    }

    /// Renders and enqueues a reconciliation, evicting the oldest entry
    /// when full
    pub fn push(&mut self, reconciliation: &Reconciliation, now: Instant) -> &Notification {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            notification: render_reconciliation(&self.title, reconciliation),
            shown_at: now,
            announced: false,
        });
        let newest = self.entries.len() - 1;
        &self.entries[newest].notification
    }

    /// Entries still within their display window, oldest first
    pub fn visible(&self, now: Instant) -> Vec<&Notification> {
        self.entries
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.shown_at) < self.display)
            .map(|entry| &entry.notification)
            .collect()
    }

    /// Returns the announcement text for the oldest entry not yet announced
    ///
    /// Each entry is announced at most once.
    pub fn take_announcement(&mut self) -> Option<String> {
        let entry = self.entries.iter_mut().find(|entry| !entry.announced)?;
        entry.announced = true;
        Some(entry.notification.title.clone())
    }

    /// Drops entries whose display window has passed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let display = self.display;
        self.entries
            .retain(|entry| now.saturating_duration_since(entry.shown_at) < display);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
