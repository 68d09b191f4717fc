//! Shared test helpers for dashboard API integration tests
//!
//! Provides wiremock-based mock server setup for the dashboard endpoints.
//! Each helper mounts the necessary mock endpoints and returns a provider
//! pointing at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trackwatch_api::client::DashboardClient;
use trackwatch_api::provider::DashboardApiProvider;

/// Sample tracking list in the server's camelCase shape
pub fn sample_trackings() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "c1f7a0e2-0000-4000-8000-000000000001",
            "userId": "user-1",
            "title": "Posts from Jan 10 to Jan 17",
            "startDate": "2026-01-10T17:00:00.000Z",
            "endDate": "2026-01-17T17:00:00.000Z",
            "isActive": true,
            "daysRemaining": 3,
            "metrics": {},
            "cumulative": 120
        },
        {
            "id": "c1f7a0e2-0000-4000-8000-000000000002",
            "title": "Posts from Jan 3 to Jan 10",
            "startDate": "2026-01-03T17:00:00.000Z",
            "endDate": "2026-01-10T17:00:00.000Z",
            "isActive": false
        }
    ])
}

/// Sets up a mock server with the bootstrap endpoints and returns
/// a (MockServer, DashboardApiProvider) tuple.
///
/// Pre-configured endpoints:
/// - GET /api/trackings → two trackings
/// - GET /api/stats/summary → {2, 1, 1}
pub async fn setup_dashboard_mock() -> (MockServer, DashboardApiProvider) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": sample_trackings()
        })))
        .mount(&server)
        .await;

    mount_summary(&server, 2, 1, 1).await;

    let provider = DashboardApiProvider::new(DashboardClient::with_base_url(server.uri()));

    (server, provider)
}

/// Mounts `GET /api/stats/summary` returning the given counts
pub async fn mount_summary(server: &MockServer, total: u64, active: u64, inactive: u64) {
    Mock::given(method("GET"))
        .and(path("/api/stats/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "total": total, "active": active, "inactive": inactive }
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /api/check-updates` returning the given timestamp
pub async fn mount_check_updates(server: &MockServer, last_update_time: f64) {
    Mock::given(method("GET"))
        .and(path("/api/check-updates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "last_update_time": last_update_time,
            "current_time": last_update_time + 1.0
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /api/latest-data` returning the given body verbatim
pub async fn mount_latest_data(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/latest-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
