//! Bulletin download behavior against a mock server.

use chrono::NaiveDate;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spimex_loader::fetcher::{bulletin_path, BulletinFetcher};
use spimex_loader::models::ListingEntry;

use crate::common::test_config;

fn entry_for(server: &MockServer, stamp: &str, date: NaiveDate) -> ListingEntry {
    ListingEntry {
        trade_date: date,
        file_url: format!("{}/oil_xls_{}.xls", server.uri(), stamp),
    }
}

#[tokio::test]
async fn test_fetch_writes_body_to_date_keyed_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xls bytes".to_vec()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let fetcher = BulletinFetcher::new(&config).unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let written = fetcher
        .fetch(&entry_for(&server, "20240603162000", date))
        .await
        .unwrap();

    assert_eq!(written, bulletin_path(dir.path(), date));
    assert_eq!(std::fs::read(&written).unwrap(), b"xls bytes");
}

#[tokio::test]
async fn test_refetch_overwrites_existing_file() {
    let server = MockServer::start().await;
    let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let fetcher = BulletinFetcher::new(&config).unwrap();
    let entry = entry_for(&server, "20240603162000", date);

    Mock::given(method("GET"))
        .and(path("/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    fetcher.fetch(&entry).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
        .mount(&server)
        .await;
    let written = fetcher.fetch(&entry).await.unwrap();

    // Same path, new contents, no duplicate files.
    assert_eq!(std::fs::read(&written).unwrap(), b"second");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_fetch_non_200_is_an_error_without_a_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oil_xls_20240603162000.xls"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let fetcher = BulletinFetcher::new(&config).unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let result = fetcher
        .fetch(&entry_for(&server, "20240603162000", date))
        .await;

    assert!(result.is_err());
    assert!(!bulletin_path(dir.path(), date).exists());
}
