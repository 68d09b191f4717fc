//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDashboardApi`] - REST endpoints of the dashboard server
//! - [`IPresentationSink`] - Consumers of reconciled data and transport status
//! - [`payload`] - Port-level wire DTOs and their normalization

pub mod dashboard_api;
pub mod payload;
pub mod presentation;

pub use dashboard_api::{IDashboardApi, LatestData};
pub use payload::{InboundPayload, NormalizedPayload, PayloadBody, PayloadSource};
pub use presentation::{IPresentationSink, Notification, Reconciliation};
