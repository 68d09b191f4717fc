//! Dashboard session - the context object
//!
//! A [`DashboardSession`] owns everything one live dashboard needs: the
//! reconciliation engine, the transport manager, the event queue that both
//! transports feed, and the presentation sink. Nothing lives in globals.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──→ run() ── until shutdown token fires ──→ dispose()
//! ```
//!
//! `run` first loads the current server state over REST as the baseline,
//! then starts the transports and handles events one at a time until the
//! shutdown token is cancelled.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use trackwatch_core::config::Config;
use trackwatch_core::domain::{Snapshot, TransportState, UpdateStamp};
use trackwatch_core::ports::{
    IDashboardApi, IPresentationSink, InboundPayload, NormalizedPayload, PayloadSource,
};

use crate::engine::SyncEngine;
use crate::transport::{TransportEvent, TransportManager};
use crate::SyncError;

/// Initial REST load used as the session's baseline
///
/// The update stamp is read before the data, so the baseline is never
/// stamped newer than what it holds; an update landing in between is picked
/// up by the next poll or heartbeat.
pub async fn bootstrap(api: &dyn IDashboardApi) -> Result<InboundPayload, SyncError> {
    let last_update_time = api.check_updates().await.map_err(SyncError::fetch)?;
    let (trackings, summary) = tokio::try_join!(api.fetch_trackings(), api.fetch_summary())
        .map_err(SyncError::fetch)?;

    Ok(InboundPayload::update(
        PayloadSource::Bootstrap,
        NormalizedPayload {
            trackings,
            summary,
            changes: None,
            last_update_time,
            data_changed: None,
        },
    ))
}

/// One live dashboard: engine, transports and event queue
pub struct DashboardSession {
    api: Arc<dyn IDashboardApi>,
    sink: Arc<dyn IPresentationSink>,
    engine: SyncEngine,
    manager: TransportManager,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    shutdown: CancellationToken,
}

impl DashboardSession {
    /// Creates a session with its own shutdown token
    pub fn new(
        config: &Config,
        api: Arc<dyn IDashboardApi>,
        sink: Arc<dyn IPresentationSink>,
    ) -> Self {
        Self::with_shutdown(config, api, sink, CancellationToken::new())
    }

    /// Creates a session stopped by the given token
    pub fn with_shutdown(
        config: &Config,
        api: Arc<dyn IDashboardApi>,
        sink: Arc<dyn IPresentationSink>,
        shutdown: CancellationToken,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = TransportManager::new(
            config,
            Arc::clone(&api),
            events_tx.clone(),
            shutdown.child_token(),
        );

        Self {
            engine: SyncEngine::new(Arc::clone(&sink)),
            api,
            sink,
            manager,
            events_tx,
            events_rx,
            shutdown,
        }
    }

    /// Token that stops [`DashboardSession::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Sender for injecting events into the session's queue
    pub fn event_sender(&self) -> mpsc::UnboundedSender<TransportEvent> {
        self.events_tx.clone()
    }

    /// Receiver observing every committed snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.engine.snapshot()
    }

    pub fn transport_state(&self) -> TransportState {
        self.manager.state()
    }

    pub fn watermark(&self) -> Option<UpdateStamp> {
        self.engine.watermark()
    }

    /// Bootstraps, starts the transports and processes events until shutdown
    ///
    /// Individual failures are logged and contained; this only returns once
    /// the shutdown token fires.
    pub async fn run(&mut self) -> Result<()> {
        info!("Dashboard session starting");

        if !self.engine.has_baseline() {
            match bootstrap(self.api.as_ref()).await {
                Ok(payload) => {
                    self.engine.on_payload(payload);
                }
                Err(e) => warn!(
                    error = %e,
                    "Bootstrap failed, first accepted payload becomes the baseline"
                ),
            }
        }

        let state = self.manager.start();
        self.sink.transport_status(state);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, leaving event loop");
                    break;
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }
                _ = self.manager.poll_tick() => {
                    let watermark = self.engine.watermark();
                    self.manager.poll(watermark);
                }
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Payload(payload) => {
                let outcome = self.engine.on_payload(payload);
                trace!(?outcome, "Payload handled");
            }
            TransportEvent::Heartbeat(heartbeat) => {
                let watermark = self.engine.watermark();
                self.manager.catch_up(heartbeat, watermark);
            }
            TransportEvent::FetchFinished => {
                let watermark = self.engine.watermark();
                self.manager.on_fetch_finished(watermark);
            }
            connectivity => {
                if let Some(state) = self.manager.on_event(&connectivity) {
                    debug!(mode = %state.mode, connected = state.connected, "Transport status changed");
                    self.sink.transport_status(state);
                }
            }
        }
    }

    /// Stops the push task, the poll timer and any in-flight fetch
    pub async fn dispose(mut self) {
        self.shutdown.cancel();
        self.manager.shutdown().await;
        info!("Dashboard session disposed");
    }
}
