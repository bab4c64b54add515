//! Sequential batch runner: discover → download → locate → normalize → persist,
//! one trade date at a time.

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::bulletin::{self, ExtractError};
use crate::crawler::ListingCrawler;
use crate::database::Database;
use crate::fetcher::BulletinFetcher;
use crate::models::{DateOutcome, ListingEntry, SkipReason, TradeRecord};
use crate::normalizer;

/// Orchestrates the pipeline over explicitly passed collaborators.
pub struct BulletinCollector {
    crawler: ListingCrawler,
    fetcher: BulletinFetcher,
    database: Database,
}

/// Summary of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub dates_loaded: usize,
    pub dates_skipped: usize,
    pub records_inserted: usize,
}

impl BulletinCollector {
    pub fn new(crawler: ListingCrawler, fetcher: BulletinFetcher, database: Database) -> Self {
        Self {
            crawler,
            fetcher,
            database,
        }
    }

    /// Processes every bulletin dated `min_date` or later, strictly
    /// sequentially: one trade date is fully acquired, extracted, and
    /// persisted before the next begins. A skipped date never aborts the run.
    pub async fn run_sync(&self, min_date: NaiveDate, max_pages: Option<u32>) -> Result<SyncReport> {
        let started = std::time::Instant::now();
        info!("Starting sync for bulletins dated {} or later", min_date);

        let entries = self.crawler.discover(min_date, max_pages).await;
        let mut report = SyncReport::default();

        for entry in &entries {
            match self.process_entry(entry).await {
                DateOutcome::Loaded(count) => {
                    info!("{}: loaded {} records", entry.trade_date, count);
                    report.dates_loaded += 1;
                    report.records_inserted += count;
                }
                DateOutcome::Skipped(reason) => {
                    warn!("{}: skipped ({})", entry.trade_date, reason);
                    report.dates_skipped += 1;
                }
            }
        }

        info!(
            "Sync finished in {:.1?}: {} dates loaded, {} skipped, {} records",
            started.elapsed(),
            report.dates_loaded,
            report.dates_skipped,
            report.records_inserted
        );
        Ok(report)
    }

    /// Processes the single most recent bulletin from the first listing
    /// page. `None` means no bulletin link was found at all.
    pub async fn run_latest(&self) -> Option<DateOutcome> {
        let entry = self.crawler.discover_latest().await?;
        let outcome = self.process_entry(&entry).await;
        match &outcome {
            DateOutcome::Loaded(count) => {
                info!("{}: loaded {} records", entry.trade_date, count)
            }
            DateOutcome::Skipped(reason) => {
                warn!("{}: skipped ({})", entry.trade_date, reason)
            }
        }
        Some(outcome)
    }

    /// Runs one trade date end to end. Every failure mode maps to a
    /// [`SkipReason`] so the caller can degrade one date at a time.
    async fn process_entry(&self, entry: &ListingEntry) -> DateOutcome {
        let path = match self.fetcher.fetch(entry).await {
            Ok(path) => path,
            Err(_) => return DateOutcome::Skipped(SkipReason::DownloadFailed),
        };

        let records = match extract_records(&path, entry.trade_date) {
            Ok(records) => records,
            Err(reason) => return DateOutcome::Skipped(reason),
        };
        if records.is_empty() {
            return DateOutcome::Skipped(SkipReason::NoQualifyingRows);
        }

        match self.database.insert_batch(&records).await {
            Ok(count) => DateOutcome::Loaded(count),
            Err(e) => {
                error!("{}: persistence failed: {}", entry.trade_date, e);
                DateOutcome::Skipped(SkipReason::PersistFailed)
            }
        }
    }
}

/// Locates the trade table in the downloaded bulletin and normalizes its
/// rows; structural failures become skip reasons rather than panics.
pub fn extract_records(
    path: &Path,
    trade_date: NaiveDate,
) -> std::result::Result<Vec<TradeRecord>, SkipReason> {
    let table = bulletin::locate(path).map_err(|e| match e {
        ExtractError::FileMissing(path) => {
            warn!("Bulletin file missing: {}", path.display());
            SkipReason::FileMissing
        }
        ExtractError::MarkerNotFound => {
            warn!("{}: marker row not found", path.display());
            SkipReason::MarkerNotFound
        }
        other => {
            warn!("{}: {}", path.display(), other);
            SkipReason::Unreadable
        }
    })?;

    Ok(normalizer::normalize(&table, trade_date))
}
