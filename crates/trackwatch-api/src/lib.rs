//! TrackWatch API - REST client for the dashboard server
//!
//! Provides:
//! - [`client::DashboardClient`] - typed HTTP client for the `/api/*` endpoints
//! - [`provider::DashboardApiProvider`] - the `IDashboardApi` port implementation
//!
//! Every endpoint answers with a `{success, data, message}` envelope. A
//! response with `success: false` is always an error, whatever the HTTP
//! status was.

pub mod client;
pub mod provider;

use thiserror::Error;
use trackwatch_core::domain::DomainError;

/// Errors that can occur when talking to the dashboard server
#[derive(Debug, Error)]
pub enum ApiError {
    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status
    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    /// The envelope carried `success: false`
    #[error("{path} reported failure: {message}")]
    Unsuccessful { path: String, message: String },

    /// The response body could not be parsed or lacked required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response parsed but did not normalize into domain types
    #[error(transparent)]
    Domain(#[from] DomainError),
}
