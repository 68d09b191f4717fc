//! Console presentation sink
//!
//! Prints the tracking list after every commit, the change feed after every
//! notifiable reconciliation, and transport status changes. The list honours
//! the configured [`StatsFilter`] and shows active trackings first.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{info, warn};

use trackwatch_core::domain::{sort_active_first, Snapshot, StatsFilter, TransportState};
use trackwatch_core::ports::{IPresentationSink, Reconciliation};
use trackwatch_sync::feed::NotificationQueue;

/// [`IPresentationSink`] writing human-readable output
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
    feed: Mutex<NotificationQueue>,
    filter: StatsFilter,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, feed: NotificationQueue, filter: StatsFilter) -> Self {
        Self {
            out: Mutex::new(out),
            feed: Mutex::new(feed),
            filter,
        }
    }

    fn emit(&self, text: &str) {
        let mut out = lock(&self.out);
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            warn!(error = %e, "Failed to write console output");
        }
    }

    /// Consumes the sink and returns its writer
    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Renders the filtered tracking list
pub fn render_list(snapshot: &Snapshot, filter: StatsFilter) -> String {
    let mut trackings = snapshot.trackings.clone();
    sort_active_first(&mut trackings);
    let shown = filter.apply(&trackings);

    let mut out = format!(
        "Trackings ({filter}: {} of {}) | total {} active {} completed {}",
        shown.len(),
        trackings.len(),
        snapshot.summary.total,
        snapshot.summary.active,
        snapshot.summary.inactive
    );
    for tracking in shown {
        let status = if tracking.is_active { "active" } else { "done" };
        out.push_str(&format!(
            "\n  [{status:>6}] {} - {}",
            tracking.title, tracking.cumulative
        ));
        if let Some(days) = tracking.days_remaining {
            out.push_str(&format!(" ({days}d left)"));
        }
    }
    out
}

impl<W: Write + Send> IPresentationSink for ConsoleSink<W> {
    fn on_reconciled(&self, reconciliation: &Reconciliation) {
        let now = Instant::now();
        let (rendered, announcement) = {
            let mut feed = lock(&self.feed);
            feed.prune(now);
            let rendered = feed.push(reconciliation, now).render();
            (rendered, feed.take_announcement())
        };

        self.emit(&rendered);
        if let Some(text) = announcement {
            info!(alert = %text, "Announcement");
            self.emit(&format!("\u{7}{text}"));
        }
    }

    fn on_snapshot(&self, snapshot: Arc<Snapshot>) {
        self.emit(&render_list(&snapshot, self.filter));
    }

    fn transport_status(&self, state: TransportState) {
        let connectivity = if state.connected {
            "connected"
        } else {
            "disconnected"
        };
        info!(mode = %state.mode, connected = state.connected, "Transport status");
        self.emit(&format!("Transport: {} ({connectivity})", state.mode));
    }
}
