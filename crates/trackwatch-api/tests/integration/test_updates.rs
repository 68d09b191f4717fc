//! Integration tests for the poll heartbeat and the latest-data fetch

use trackwatch_api::ApiError;
use trackwatch_core::domain::StatsSummary;
use trackwatch_core::ports::IDashboardApi;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_check_updates_returns_stamp() {
    let (server, provider) = common::setup_dashboard_mock().await;
    common::mount_check_updates(&server, 1_768_500_000.25).await;

    let stamp = provider.check_updates().await.expect("check updates failed");
    assert_eq!(stamp.as_secs(), 1_768_500_000.25);
}

#[tokio::test]
async fn test_check_updates_without_stamp_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/check-updates"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })),
        )
        .mount(&server)
        .await;

    let provider = trackwatch_api::provider::DashboardApiProvider::new(
        trackwatch_api::client::DashboardClient::with_base_url(server.uri()),
    );

    assert!(provider.check_updates().await.is_err());
}

#[tokio::test]
async fn test_latest_data_unchanged() {
    let (server, provider) = common::setup_dashboard_mock().await;
    common::mount_latest_data(
        &server,
        serde_json::json!({
            "success": true,
            "data_changed": false,
            "message": "no change"
        }),
    )
    .await;

    let latest = provider.fetch_latest_data().await.expect("latest data failed");
    assert!(!latest.data_changed);
    assert!(latest.data.is_none());
}

#[tokio::test]
async fn test_latest_data_changed_normalizes_with_summary() {
    let (server, provider) = common::setup_dashboard_mock().await;
    common::mount_latest_data(
        &server,
        serde_json::json!({
            "success": true,
            "data_changed": true,
            "data": {
                "trackings": common::sample_trackings(),
                "summary": { "total": 2, "active": 1, "inactive": 1 },
                "last_update": 1_768_500_010.0,
                "changes": [{
                    "tracking_id": "c1f7a0e2-0000-4000-8000-000000000001",
                    "title": "Posts from Jan 10 to Jan 17",
                    "previous_cumulative": 118,
                    "current_cumulative": 120,
                    "change": 2
                }]
            }
        }),
    )
    .await;

    let latest = provider.fetch_latest_data().await.expect("latest data failed");
    assert!(latest.data_changed);

    let summary = provider.fetch_summary().await.unwrap();
    let payload = latest
        .data
        .expect("data present")
        .normalize(summary, None)
        .expect("normalize");

    assert_eq!(payload.trackings.len(), 2);
    assert_eq!(payload.summary, StatsSummary::new(2, 1, 1));
    assert_eq!(payload.last_update_time.as_secs(), 1_768_500_010.0);

    let changes = payload.changes.expect("changes present");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change, 2);
}

#[tokio::test]
async fn test_latest_data_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/latest-data"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "success": false,
            "message": "boom"
        })))
        .mount(&server)
        .await;

    let provider = trackwatch_api::provider::DashboardApiProvider::new(
        trackwatch_api::client::DashboardClient::with_base_url(server.uri()),
    );

    let err = provider.fetch_latest_data().await.unwrap_err();
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Status { status, .. }) => assert_eq!(*status, 500),
        other => panic!("unexpected error: {other:?}"),
    }
}
