//! Transport manager - push/poll failover
//!
//! The [`TransportManager`] owns the push channel and the poll timer and
//! guarantees that at most one of them is live at any instant.
//!
//! ## State machine
//!
//! ```text
//! Init ──push url──→ PushConnecting ──Connected──→ PushConnected
//!  │                       │                          │   ↑
//!  │                 Disconnected/Timeout    Disconnected/Timeout
//!  │                       ↓                          ↓   │
//!  └──no push url──→   PollActive  ←──────────────────┘   │
//!                          └──────────Connected───────────┘
//! ```
//!
//! While connecting, polling stays off. Entering `PollActive` starts a
//! fixed-interval timer whose first tick fires immediately; a successful
//! push connect drops the timer. A poll fetch already in flight when push
//! comes back is allowed to finish; the engine's watermark decides whether
//! its result still counts.
//!
//! All fetches run in spawned tasks that report back through the same event
//! queue as the push channel, so the session handles every outcome in order.
//! A push heartbeat that arrives while a fetch is running is held and
//! replayed once that fetch reports [`TransportEvent::FetchFinished`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use trackwatch_core::config::Config;
use trackwatch_core::domain::{TransportMode, TransportState, UpdateStamp};
use trackwatch_core::ports::{IDashboardApi, InboundPayload, PayloadSource};

use crate::push::{PushChannel, PushConfig};
use crate::SyncError;

// ============================================================================
// Events and phases
// ============================================================================

/// Everything that can happen on a transport, in one ordered queue
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Push connection established
    Connected,
    /// Push connection lost or refused
    Disconnected(String),
    /// Push connect attempt timed out
    Timeout,
    /// Normalized data from either transport
    Payload(InboundPayload),
    /// Push `server_time` announcement
    Heartbeat(UpdateStamp),
    /// A spawned fetch has delivered its result, if any
    FetchFinished,
}

/// Failover state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Init,
    PushConnecting,
    PushConnected,
    PollActive,
}

impl TransportPhase {
    /// Status as reported to the presentation layer
    pub fn state(&self) -> TransportState {
        match self {
            TransportPhase::Init | TransportPhase::PushConnecting => {
                TransportState::push_connecting()
            }
            TransportPhase::PushConnected => TransportState::push_connected(),
            TransportPhase::PollActive => TransportState::polling(),
        }
    }
}

/// What a spawned fetch starts from
#[derive(Debug, Clone, Copy)]
enum FetchTrigger {
    /// Poll tick: ask `check-updates` first
    PollTick { watermark: Option<UpdateStamp> },
    /// Heartbeat already known to be newer
    Heartbeat(UpdateStamp),
}

impl FetchTrigger {
    fn source(&self) -> PayloadSource {
        match self {
            FetchTrigger::PollTick { .. } => PayloadSource::Poll,
            FetchTrigger::Heartbeat(_) => PayloadSource::Push,
        }
    }
}

// ============================================================================
// Poll cycle
// ============================================================================

/// One poll cycle: heartbeat, then a full fetch if the server moved on
///
/// Returns `Ok(None)` when the heartbeat is not newer than `watermark`.
pub async fn poll_cycle(
    api: &dyn IDashboardApi,
    watermark: Option<UpdateStamp>,
) -> Result<Option<InboundPayload>, SyncError> {
    let heartbeat = api.check_updates().await.map_err(SyncError::fetch)?;

    if let Some(watermark) = watermark {
        if !heartbeat.is_newer_than(&watermark) {
            trace!(%heartbeat, %watermark, "No new data on server");
            return Ok(None);
        }
    }

    fetch_latest(api, heartbeat, PayloadSource::Poll)
        .await
        .map(Some)
}

/// Fetches latest data and the summary, stamped with `heartbeat`
///
/// `source` is the transport that asked for the fetch.
pub async fn fetch_latest(
    api: &dyn IDashboardApi,
    heartbeat: UpdateStamp,
    source: PayloadSource,
) -> Result<InboundPayload, SyncError> {
    let latest = api.fetch_latest_data().await.map_err(SyncError::fetch)?;

    if !latest.data_changed {
        return Ok(InboundPayload::unchanged(source, heartbeat));
    }

    let data = latest.data.ok_or_else(|| {
        SyncError::MalformedPayload("latest-data reported a change without data".to_string())
    })?;
    let summary = api.fetch_summary().await.map_err(SyncError::fetch)?;
    let payload = data.normalize(summary, Some(heartbeat))?;

    Ok(InboundPayload::update(source, payload))
}

// ============================================================================
// TransportManager
// ============================================================================

/// Owns the active transport and the failover policy
pub struct TransportManager {
    phase: TransportPhase,
    api: Arc<dyn IDashboardApi>,
    events: mpsc::UnboundedSender<TransportEvent>,
    poll_interval: Duration,
    poll_timer: Option<Interval>,
    fetch_task: Option<JoinHandle<()>>,
    pending_heartbeat: Option<UpdateStamp>,
    push_config: Option<PushConfig>,
    push: Option<PushChannel>,
    cancel: CancellationToken,
}

impl TransportManager {
    /// Creates a manager in `Init`
    ///
    /// `cancel` is the parent token of the push task.
    pub fn new(
        config: &Config,
        api: Arc<dyn IDashboardApi>,
        events: mpsc::UnboundedSender<TransportEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            phase: TransportPhase::Init,
            api,
            events,
            poll_interval: config.transport.poll_interval(),
            poll_timer: None,
            fetch_task: None,
            pending_heartbeat: None,
            push_config: PushConfig::from_config(&config.server, &config.transport),
            push: None,
            cancel,
        }
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn state(&self) -> TransportState {
        self.phase.state()
    }

    /// The single live transport, `None` before start
    ///
    /// An outstanding push attempt counts as push: polling stays off until
    /// it fails.
    pub fn active_transport(&self) -> Option<TransportMode> {
        match self.phase {
            TransportPhase::Init => None,
            TransportPhase::PushConnecting | TransportPhase::PushConnected => {
                Some(TransportMode::Push)
            }
            TransportPhase::PollActive => Some(TransportMode::Poll),
        }
    }

    /// Whether the poll timer is running
    pub fn is_polling(&self) -> bool {
        self.poll_timer.is_some()
    }

    /// Whether a fetch task is still running
    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Leaves `Init`: starts the push channel, or polling when there is none
    pub fn start(&mut self) -> TransportState {
        if self.phase != TransportPhase::Init {
            return self.state();
        }

        match self.push_config.clone() {
            Some(config) => {
                info!(url = %config.url, "Starting push transport");
                self.push = Some(PushChannel::spawn(
                    config,
                    self.events.clone(),
                    self.cancel.child_token(),
                ));
                self.phase = TransportPhase::PushConnecting;
            }
            None => {
                info!("No push URL configured, polling only");
                self.enter_polling();
            }
        }

        self.state()
    }

    /// Applies a connectivity event; returns the new state if it changed
    pub fn on_event(&mut self, event: &TransportEvent) -> Option<TransportState> {
        match event {
            TransportEvent::Connected => {
                if self.phase == TransportPhase::PushConnected {
                    return None;
                }
                if self.poll_timer.take().is_some() {
                    info!("Push connected, polling stopped");
                }
                self.phase = TransportPhase::PushConnected;
                Some(self.state())
            }
            TransportEvent::Disconnected(_) | TransportEvent::Timeout => {
                if self.phase == TransportPhase::PollActive {
                    return None;
                }
                warn!(
                    reason = %describe(event),
                    interval_secs = self.poll_interval.as_secs(),
                    "Push unavailable, falling back to polling"
                );
                self.enter_polling();
                Some(self.state())
            }
            TransportEvent::Payload(_)
            | TransportEvent::Heartbeat(_)
            | TransportEvent::FetchFinished => None,
        }
    }

    fn enter_polling(&mut self) {
        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll_timer = Some(timer);
        self.phase = TransportPhase::PollActive;
    }

    /// Resolves on the next poll tick; never resolves while not polling
    pub async fn poll_tick(&mut self) {
        match self.poll_timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Starts a poll cycle unless one is already in flight
    ///
    /// Returns true if a cycle was started.
    pub fn poll(&mut self, watermark: Option<UpdateStamp>) -> bool {
        if !self.is_polling() {
            return false;
        }
        self.spawn_fetch(FetchTrigger::PollTick { watermark })
    }

    /// Handles a push heartbeat: fetches over REST if it is newer than
    /// `watermark`
    ///
    /// While another fetch is running the heartbeat is held (the newest one
    /// wins) until [`TransportManager::on_fetch_finished`]. Returns true if a
    /// fetch was started.
    pub fn catch_up(&mut self, heartbeat: UpdateStamp, watermark: Option<UpdateStamp>) -> bool {
        if let Some(watermark) = watermark {
            if !heartbeat.is_newer_than(&watermark) {
                trace!(%heartbeat, %watermark, "Heartbeat not newer than watermark");
                return false;
            }
        }

        if self.fetch_in_flight() {
            let pending = self
                .pending_heartbeat
                .map_or(heartbeat, |pending| pending.max(heartbeat));
            debug!(%pending, "Fetch in flight, catch-up deferred");
            self.pending_heartbeat = Some(pending);
            return false;
        }

        debug!(%heartbeat, "Heartbeat ahead of watermark, catching up");
        self.spawn_fetch(FetchTrigger::Heartbeat(heartbeat))
    }

    /// Handles [`TransportEvent::FetchFinished`]: replays a deferred
    /// heartbeat against the now current `watermark`
    ///
    /// Returns true if a catch-up fetch was started.
    pub fn on_fetch_finished(&mut self, watermark: Option<UpdateStamp>) -> bool {
        // The task has sent its last event and is about to return
        self.fetch_task = None;

        match self.pending_heartbeat.take() {
            Some(heartbeat) => self.catch_up(heartbeat, watermark),
            None => false,
        }
    }

    /// Heartbeat waiting for the running fetch to finish
    pub fn pending_heartbeat(&self) -> Option<UpdateStamp> {
        self.pending_heartbeat
    }

    fn spawn_fetch(&mut self, trigger: FetchTrigger) -> bool {
        if self.fetch_in_flight() {
            debug!("Previous fetch still in flight, skipping");
            return false;
        }

        let api = Arc::clone(&self.api);
        let events = self.events.clone();

        self.fetch_task = Some(tokio::spawn(async move {
            let source = trigger.source();
            let result = match trigger {
                FetchTrigger::PollTick { watermark } => poll_cycle(api.as_ref(), watermark).await,
                FetchTrigger::Heartbeat(heartbeat) => {
                    fetch_latest(api.as_ref(), heartbeat, source).await.map(Some)
                }
            };

            // The session may already be gone
            match result {
                Ok(Some(payload)) => {
                    let _ = events.send(TransportEvent::Payload(payload));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, %source, "Fetch cycle abandoned"),
            }
            let _ = events.send(TransportEvent::FetchFinished);
        }));

        true
    }

    /// Stops the push task, the poll timer and any in-flight fetch
    pub async fn shutdown(&mut self) {
        self.poll_timer = None;
        self.pending_heartbeat = None;
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(push) = self.push.take() {
            push.shutdown().await;
        }
        info!("Transports stopped");
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(push) = self.push.take() {
            push.abort();
        }
    }
}

fn describe(event: &TransportEvent) -> String {
    match event {
        TransportEvent::Disconnected(reason) => reason.clone(),
        TransportEvent::Timeout => "connect timeout".to_string(),
        other => format!("{other:?}"),
    }
}
