//! TrackWatch Core - Domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Tracking`, `StatsSummary`, `Snapshot`, `ChangeRecord`
//! - **Transport state** - `TransportMode` and `TransportState` for the failover machine
//! - **Port definitions** - Traits for adapters: `IDashboardApi`, `IPresentationSink`
//! - **Wire DTOs** - Port-level payload shapes and their explicit normalization
//!
//! # Architecture
//!
//! The domain module contains pure data with no I/O. Ports define the trait
//! interfaces that adapter crates (`trackwatch-api`, the daemon's console
//! sink) implement, and that the sync engine depends on.

pub mod config;
pub mod domain;
pub mod ports;
