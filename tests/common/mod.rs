//! Shared fixtures: listing-page HTML builders and record builders.

#![allow(dead_code)]

use std::path::Path;

use chrono::{NaiveDate, Utc};
use spimex_loader::models::{Config, TradeRecord};

/// Anchor markup the exchange uses for downloadable bulletin files.
pub fn file_anchor(stamp: &str) -> String {
    format!(
        "<a class=\"accordeon-inner__item-title link xls\" \
         href=\"/upload/reports/oil_xls/oil_xls_{stamp}.xls?r=1\">\
         Бюллетень по итогам торгов в Секции «Нефтепродукты»</a>"
    )
}

/// A listing page wrapping the given anchors, optionally with a next-page
/// control pointing at `next_page`.
pub fn listing_page(anchors: &[String], next_page: Option<u32>) -> String {
    let pagination = match next_page {
        Some(n) => format!(
            "<div class=\"bx-pagination\">\
             <div class=\"bx-pag-next\"><a href=\"?page=page-{n}\">Следующая</a></div>\
             </div>"
        ),
        None => String::new(),
    };
    format!(
        "<html><body><div class=\"accordeon-inner\">{}</div>{}</body></html>",
        anchors.join("\n"),
        pagination
    )
}

/// Config pointed at a mock server and a scratch data directory.
pub fn test_config(base_url: &str, data_dir: &Path) -> Config {
    Config {
        database_path: ":memory:".to_string(),
        base_url: base_url.to_string(),
        data_dir: data_dir.to_string_lossy().into_owned(),
        min_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        http_timeout_secs: 5,
    }
}

/// A well-formed trade record for persistence tests.
pub fn trade_record(instrument_code: &str, trade_date: NaiveDate) -> TradeRecord {
    let now = Utc::now();
    TradeRecord {
        id: None,
        instrument_code: instrument_code.to_string(),
        instrument_name: "Бензин (АИ-100-К5)".to_string(),
        oil_id: instrument_code.chars().take(4).collect(),
        delivery_basis_id: instrument_code.chars().skip(4).take(3).collect(),
        delivery_basis_name: "Ачинский НПЗ".to_string(),
        delivery_type_id: instrument_code
            .chars()
            .last()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        volume: 120.0,
        total: 9_270_000.0,
        contract_count: 3,
        trade_date,
        created_at: now,
        updated_at: now,
    }
}
