//! Integration tests for trackwatch-api
//!
//! Uses wiremock to simulate the dashboard server and verifies end-to-end
//! behavior of the DashboardClient and the IDashboardApi provider.

mod common;

mod test_trackings;
mod test_updates;
