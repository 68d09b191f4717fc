//! TrackWatch Sync - Dual-transport synchronization engine
//!
//! Provides:
//! - Push/poll transport selection with automatic failover
//! - Change detection between the committed snapshot and each new payload
//! - Watermark-based rejection of stale and re-delivered updates
//! - A bounded, human-readable change feed
//!
//! ## Modules
//!
//! - [`store`] - Atomically replaced snapshot holder
//! - [`detector`] - Structural diff of a snapshot against a payload
//! - [`engine`] - Reconciliation state machine (watermark, baseline, commit)
//! - [`transport`] - Failover state machine and poll cycles
//! - [`push`] - WebSocket push channel
//! - [`session`] - Context object wiring everything onto one event queue
//! - [`feed`] - Notification queue rendering reconciliations

pub mod detector;
pub mod engine;
pub mod feed;
pub mod push;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Errors that can occur during synchronization
///
/// None of these are fatal; the session logs them and keeps running.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Push connect failure, timeout or disconnect
    #[error("Transport error: {0}")]
    Transport(String),

    /// A REST call failed or reported `success: false`
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// An inbound message lacked required fields or was not valid JSON
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A domain-level error propagated from trackwatch-core
    #[error("Domain error: {0}")]
    DomainError(#[from] trackwatch_core::domain::DomainError),
}

impl SyncError {
    /// Wraps an adapter error, keeping its context chain in the message
    pub(crate) fn fetch(err: anyhow::Error) -> Self {
        SyncError::Fetch(format!("{err:#}"))
    }
}
