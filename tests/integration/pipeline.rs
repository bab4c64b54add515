//! End-to-end batch behavior: a structurally bad bulletin skips its own
//! date and never aborts the run.

use chrono::NaiveDate;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spimex_loader::collector::BulletinCollector;
use spimex_loader::crawler::ListingCrawler;
use spimex_loader::database::Database;
use spimex_loader::fetcher::BulletinFetcher;
use spimex_loader::models::{DateOutcome, SkipReason};

use crate::common::{file_anchor, listing_page, test_config};

async fn collector_for(
    server: &MockServer,
    dir: &tempfile::TempDir,
) -> (BulletinCollector, Database) {
    let config = test_config(&server.uri(), dir.path());
    let db_path = dir.path().join("pipeline.db");
    let database = Database::connect(db_path.to_str().unwrap()).await.unwrap();

    let collector = BulletinCollector::new(
        ListingCrawler::new(&config).unwrap(),
        BulletinFetcher::new(&config).unwrap(),
        database.clone(),
    );
    (collector, database)
}

#[tokio::test]
async fn test_sync_degrades_one_date_at_a_time() {
    let server = MockServer::start().await;
    let page = listing_page(
        &[file_anchor("20240603162000"), file_anchor("20240602162000")],
        None,
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "page-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    // First bulletin downloads but is not a readable spreadsheet; the second
    // fails to download at all.
    Mock::given(method("GET"))
        .and(path("/upload/reports/oil_xls/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an xls".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/upload/reports/oil_xls/oil_xls_20240602162000.xls"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let (collector, database) = collector_for(&server, &dir).await;

    let min_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let report = collector.run_sync(min_date, None).await.unwrap();

    assert_eq!(report.dates_loaded, 0);
    assert_eq!(report.dates_skipped, 2);
    assert_eq!(report.records_inserted, 0);
    assert_eq!(database.record_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_latest_reports_skip_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[file_anchor("20240603162000")], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/upload/reports/oil_xls/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let (collector, _database) = collector_for(&server, &dir).await;

    let outcome = collector.run_latest().await;
    assert_eq!(
        outcome,
        Some(DateOutcome::Skipped(SkipReason::DownloadFailed))
    );
}

#[tokio::test]
async fn test_latest_none_when_listing_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], None)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let (collector, _database) = collector_for(&server, &dir).await;

    assert_eq!(collector.run_latest().await, None);
}
