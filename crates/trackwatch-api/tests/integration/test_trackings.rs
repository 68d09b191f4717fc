//! Integration tests for tracking list, summary and per-tracking detail

use trackwatch_api::ApiError;
use trackwatch_core::domain::{StatsSummary, TrackingId};
use trackwatch_core::ports::IDashboardApi;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_fetch_trackings_normalizes_fields() {
    let (_server, provider) = common::setup_dashboard_mock().await;

    let trackings = provider
        .fetch_trackings()
        .await
        .expect("fetch trackings failed");

    assert_eq!(trackings.len(), 2);

    let first = &trackings[0];
    assert_eq!(first.title, "Posts from Jan 10 to Jan 17");
    assert!(first.is_active);
    assert_eq!(first.cumulative, 120);
    assert_eq!(first.days_remaining, Some(3));
    assert!(first.start_date.is_some());

    // Missing cumulative defaults to zero
    let second = &trackings[1];
    assert!(!second.is_active);
    assert_eq!(second.cumulative, 0);
}

#[tokio::test]
async fn test_fetch_summary() {
    let (_server, provider) = common::setup_dashboard_mock().await;

    let summary = provider.fetch_summary().await.expect("fetch summary failed");
    assert_eq!(summary, StatsSummary::new(2, 1, 1));
}

#[tokio::test]
async fn test_fetch_tracking_stats() {
    let (server, provider) = common::setup_dashboard_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings/t-1/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "trackingId": "t-1",
                "total": 12,
                "cumulative": 120,
                "pace": 17.1,
                "percentComplete": 57,
                "daysElapsed": 4,
                "daysRemaining": 3,
                "daysTotal": 7,
                "isComplete": false,
                "daily": []
            }
        })))
        .mount(&server)
        .await;

    let stats = provider
        .fetch_tracking_stats(&TrackingId::new("t-1").unwrap())
        .await
        .expect("fetch stats failed");

    assert_eq!(stats.cumulative, 120);
    assert_eq!(stats.percent_complete, 57);
    assert_eq!(stats.days_total, 7);
    assert!(!stats.is_complete);
}

#[tokio::test]
async fn test_missing_stats_surface_server_message() {
    let (server, provider) = common::setup_dashboard_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings/missing/stats"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "success": false,
            "message": "Stats not found"
        })))
        .mount(&server)
        .await;

    let err = provider
        .fetch_tracking_stats(&TrackingId::new("missing").unwrap())
        .await
        .unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Status {
            status, message, ..
        }) => {
            assert_eq!(*status, 404);
            assert_eq!(message, "Stats not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_hourly() {
    let (server, provider) = common::setup_dashboard_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings/t-1/hourly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": [
                {
                    "id": 1,
                    "trackingId": "t-1",
                    "statsDate": "2026-01-15T00:00:00",
                    "beijingDate": "2026-01-15T08:00:00+00:00",
                    "count": 4,
                    "cumulative": 100
                },
                {
                    "id": 2,
                    "trackingId": "t-1",
                    "beijingDate": "2026-01-15T09:00:00+00:00",
                    "count": 2
                }
            ]
        })))
        .mount(&server)
        .await;

    let buckets = provider
        .fetch_hourly(&TrackingId::new("t-1").unwrap())
        .await
        .expect("fetch hourly failed");

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].count, 4);
    assert_eq!(buckets[1].beijing_date.to_rfc3339(), "2026-01-15T09:00:00+00:00");
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_an_error() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "database locked"
        })))
        .mount(&server)
        .await;

    let provider = trackwatch_api::provider::DashboardApiProvider::new(
        trackwatch_api::client::DashboardClient::with_base_url(server.uri()),
    );

    let err = provider.fetch_trackings().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unsuccessful { .. })
    ));
}

#[tokio::test]
async fn test_tracking_without_id_is_rejected() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/trackings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": [{ "title": "orphan" }]
        })))
        .mount(&server)
        .await;

    let provider = trackwatch_api::provider::DashboardApiProvider::new(
        trackwatch_api::client::DashboardClient::with_base_url(server.uri()),
    );

    assert!(provider.fetch_trackings().await.is_err());
}
