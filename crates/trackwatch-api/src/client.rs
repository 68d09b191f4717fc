//! Dashboard REST client
//!
//! Provides a typed HTTP client for the dashboard server's `/api/*`
//! endpoints. Handles endpoint construction, the response envelope and JSON
//! deserialization into the port-level wire DTOs; normalization into domain
//! types happens in [`crate::provider`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trackwatch_api::client::DashboardClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DashboardClient::with_base_url("http://127.0.0.1:8085");
//! let trackings = client.get_trackings().await?;
//! println!("{} trackings", trackings.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use trackwatch_core::config::ServerConfig;
use trackwatch_core::domain::TrackingId;
use trackwatch_core::ports::payload::{
    PollData, RawHourlyBucket, RawSummary, RawTracking, RawTrackingStats,
};

use crate::ApiError;

// ============================================================================
// Response envelopes
// ============================================================================

/// Access to the `success` / `message` pair every response carries
trait Enveloped {
    fn success(&self) -> Option<bool>;
    fn message(&self) -> Option<&str>;
}

/// Standard `{success, data, message}` envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Enveloped for Envelope<T> {
    fn success(&self) -> Option<bool> {
        self.success
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Body of `GET /api/check-updates`
#[derive(Debug, Deserialize)]
pub struct CheckUpdatesResponse {
    pub success: Option<bool>,
    pub last_update_time: Option<f64>,
    /// Server wall clock at response time; informational only
    pub current_time: Option<f64>,
    pub message: Option<String>,
}

impl Enveloped for CheckUpdatesResponse {
    fn success(&self) -> Option<bool> {
        self.success
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Body of `GET /api/latest-data`
#[derive(Debug, Deserialize)]
pub struct LatestDataResponse {
    pub success: Option<bool>,
    pub data_changed: Option<bool>,
    pub data: Option<PollData>,
    pub message: Option<String>,
}

impl Enveloped for LatestDataResponse {
    fn success(&self) -> Option<bool> {
        self.success
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Error body shape used to extract a message from non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// DashboardClient
// ============================================================================

/// HTTP client for the dashboard REST API
#[derive(Debug, Clone)]
pub struct DashboardClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without trailing slash
    base_url: String,
}

impl DashboardClient {
    /// Creates a client from the `server` configuration section
    ///
    /// Applies `request_timeout_secs` to every request.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with a custom base URL and no request timeout
    /// (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Same as [`DashboardClient::with_base_url`] with an explicit timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/api/trackings")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url)
    }

    /// Sends a GET, checks HTTP status and envelope, and parses the body
    async fn get_enveloped<R>(&self, path: &str) -> Result<R>
    where
        R: DeserializeOwned + Enveloped,
    {
        debug!(path, "GET");

        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send GET {path}"))?;

        let response = check_status(path, response).await?;

        let body: R = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse {path} response"))?;

        match body.success() {
            Some(true) => Ok(body),
            Some(false) => Err(ApiError::Unsuccessful {
                path: path.to_string(),
                message: body.message().unwrap_or("no message").to_string(),
            }
            .into()),
            None => Err(ApiError::InvalidResponse(format!("{path}: missing success flag")).into()),
        }
    }

    /// Like [`Self::get_enveloped`] for `{success, data}` bodies, requiring `data`
    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let envelope: Envelope<T> = self.get_enveloped(path).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("{path}: missing data")).into())
    }

    /// `GET /api/trackings`
    pub async fn get_trackings(&self) -> Result<Vec<RawTracking>> {
        self.get_data("/api/trackings").await
    }

    /// `GET /api/stats/summary`
    pub async fn get_summary(&self) -> Result<RawSummary> {
        self.get_data("/api/stats/summary").await
    }

    /// `GET /api/trackings/{id}/stats`
    pub async fn get_tracking_stats(&self, id: &TrackingId) -> Result<RawTrackingStats> {
        self.get_data(&format!("/api/trackings/{}/stats", id.as_str()))
            .await
    }

    /// `GET /api/trackings/{id}/hourly`
    pub async fn get_hourly(&self, id: &TrackingId) -> Result<Vec<RawHourlyBucket>> {
        self.get_data(&format!("/api/trackings/{}/hourly", id.as_str()))
            .await
    }

    /// `GET /api/check-updates`
    pub async fn check_updates(&self) -> Result<CheckUpdatesResponse> {
        self.get_enveloped("/api/check-updates").await
    }

    /// `GET /api/latest-data`
    pub async fn latest_data(&self) -> Result<LatestDataResponse> {
        self.get_enveloped("/api/latest-data").await
    }
}

/// Turns a non-2xx response into [`ApiError::Status`], keeping the server's
/// `message` when the body has one
async fn check_status(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    warn!(path, status = status.as_u16(), %message, "Request failed");

    Err(ApiError::Status {
        path: path.to_string(),
        status: status.as_u16(),
        message,
    }
    .into())
}
