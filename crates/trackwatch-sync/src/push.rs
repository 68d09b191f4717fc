//! WebSocket push channel
//!
//! A background task that keeps one WebSocket connection to the dashboard
//! server alive and turns what happens on it into [`TransportEvent`]s:
//!
//! ```text
//! connect ──ok──→ Connected ──frames──→ Payload / Heartbeat
//!    │                 │
//!  timeout          close/error
//!    ↓                 ↓
//!  Timeout       Disconnected ──reconnect_delay──→ connect
//! ```
//!
//! Reconnecting is the channel's job; the transport manager only reacts to
//! the resulting events.
//!
//! ## Wire format
//!
//! Text frames carry `{"event": "<name>", "data": {...}}`. Recognized events
//! are `data_update` and `server_time`; anything else is ignored.

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use trackwatch_core::config::{ServerConfig, TransportConfig};
use trackwatch_core::ports::payload::{PushUpdate, ServerTime};
use trackwatch_core::ports::{InboundPayload, PayloadSource};

use crate::transport::TransportEvent;
use crate::SyncError;

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings of the push channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// `ws://` or `wss://` URL
    pub url: String,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl PushConfig {
    /// Builds the push settings, or `None` when no push URL is configured
    pub fn from_config(server: &ServerConfig, transport: &TransportConfig) -> Option<Self> {
        server.push_url.as_ref().map(|url| Self {
            url: url.clone(),
            connect_timeout: transport.connect_timeout(),
            reconnect_delay: transport.reconnect_delay(),
        })
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parses one text frame
///
/// Returns `Ok(None)` for events this client does not handle.
pub fn parse_frame(text: &str) -> Result<Option<TransportEvent>, SyncError> {
    let envelope: PushEnvelope = serde_json::from_str(text)
        .map_err(|e| SyncError::MalformedPayload(format!("invalid push envelope: {e}")))?;

    match envelope.event.as_str() {
        "data_update" => {
            let update: PushUpdate = serde_json::from_value(envelope.data)
                .map_err(|e| SyncError::MalformedPayload(format!("invalid data_update: {e}")))?;
            let payload = update.normalize()?;
            Ok(Some(TransportEvent::Payload(InboundPayload::update(
                PayloadSource::Push,
                payload,
            ))))
        }
        "server_time" => {
            let server_time: ServerTime = serde_json::from_value(envelope.data)
                .map_err(|e| SyncError::MalformedPayload(format!("invalid server_time: {e}")))?;
            Ok(Some(TransportEvent::Heartbeat(server_time.stamp()?)))
        }
        other => {
            debug!(event = other, "Ignoring unknown push event");
            Ok(None)
        }
    }
}

// ============================================================================
// PushChannel
// ============================================================================

/// Handle to the running push task
#[derive(Debug)]
pub struct PushChannel {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PushChannel {
    /// Spawns the connect/read/reconnect loop
    ///
    /// The task stops when `cancel` fires or when the event receiver is
    /// dropped.
    pub fn spawn(
        config: PushConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_push_loop(config, events, task_cancel).await;
        });
        Self { cancel, handle }
    }

    /// Returns true once the task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the task and waits for it to close the connection
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Push task ended abnormally");
        }
    }

    /// Stops the task without waiting
    pub fn abort(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

async fn run_push_loop(
    config: PushConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    cancel: CancellationToken,
) {
    info!(url = %config.url, "Push channel starting");

    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = timeout(config.connect_timeout, connect_async(config.url.as_str())) => attempt,
        };

        let event = match attempt {
            Err(_) => {
                let err = SyncError::Transport(format!(
                    "connect timed out after {}s",
                    config.connect_timeout.as_secs()
                ));
                warn!(url = %config.url, error = %err, "Push connect failed");
                TransportEvent::Timeout
            }
            Ok(Err(e)) => {
                let err = SyncError::Transport(format!("connect failed: {e}"));
                warn!(url = %config.url, error = %err, "Push connect failed");
                TransportEvent::Disconnected(err.to_string())
            }
            Ok(Ok((mut stream, _response))) => {
                info!(url = %config.url, "Push channel connected");
                if events.send(TransportEvent::Connected).is_err() {
                    break;
                }
                match read_frames(&mut stream, &events, &cancel).await {
                    Some(reason) => {
                        warn!(url = %config.url, reason = %reason, "Push channel disconnected");
                        TransportEvent::Disconnected(reason)
                    }
                    None => break,
                }
            }
        };

        if events.send(event).is_err() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
        debug!(url = %config.url, "Push channel reconnecting");
    }

    info!("Push channel stopped");
}

/// Forwards frames until the connection drops
///
/// Returns the disconnect reason, or `None` when the loop should stop
/// (cancellation or a dropped receiver).
async fn read_frames<S>(
    stream: &mut WebSocketStream<S>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    cancel: &CancellationToken,
) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = stream.close(None).await {
                    debug!(error = %e, "Error closing push connection");
                }
                return None;
            }
            frame = stream.next() => frame,
        };

        match frame {
            None => return Some("stream ended".to_string()),
            Some(Err(e)) => return Some(format!("read error: {e}")),
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(Some(event)) => {
                    if events.send(event).is_err() {
                        return None;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Dropping malformed push message"),
            },
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| format!("closed by server: {} {}", f.code, f.reason))
                    .unwrap_or_else(|| "closed by server".to_string());
                return Some(reason);
            }
            Some(Ok(_)) => {}
        }
    }
}
