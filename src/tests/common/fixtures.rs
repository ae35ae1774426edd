use axum_test::TestServer;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use crate::handlers::api::AppState;
use crate::routes::create_router;
use crate::services::catalog::CatalogService;
use crate::services::ledger::MeetingLedger;

/// Spin up a TestServer over a fresh application state backed by CSV files
/// in a temporary directory. The TempDir must stay alive for the duration of
/// the test.
pub fn setup_test_server() -> (TestServer, TempDir) {
    let dir = tempdir().unwrap();

    let catalog = Arc::new(
        CatalogService::new(
            dir.path().join("event_types.csv").to_str().unwrap(),
            dir.path().join("availability_rules.csv").to_str().unwrap(),
        )
        .unwrap(),
    );
    let ledger =
        Arc::new(MeetingLedger::new(dir.path().join("meetings.csv").to_str().unwrap()).unwrap());

    let app_state = Arc::new(AppState { catalog, ledger });
    let app = create_router(app_state);

    let server = TestServer::builder().mock_transport().build(app).unwrap();

    (server, dir)
}

/// First Monday at least a week in the future, so endpoint tests using the
/// real clock never trip over the past-slot filter.
pub fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday().num_days_from_monday() != 0 {
        date += Duration::days(1);
    }
    date
}

