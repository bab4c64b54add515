//! Downloading bulletin files to their deterministic local paths.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{info, warn};

use crate::models::{Config, ListingEntry};

/// Downloads bulletin files into the data directory.
pub struct BulletinFetcher {
    client: Client,
    data_dir: PathBuf,
}

/// Local path a bulletin for `trade_date` is stored at. One file per date;
/// a re-run overwrites it.
pub fn bulletin_path(data_dir: &Path, trade_date: NaiveDate) -> PathBuf {
    data_dir.join(format!("oil_bulletin{}.xls", trade_date))
}

impl BulletinFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .user_agent("spimex-loader/0.1")
            .build()?;

        Ok(Self {
            client,
            data_dir: PathBuf::from(&config.data_dir),
        })
    }

    /// Fetches the entry's file and writes the body verbatim to the
    /// deterministic path for its trade date. Failure is logged and returned;
    /// the caller decides whether the batch continues.
    pub async fn fetch(&self, entry: &ListingEntry) -> Result<PathBuf> {
        let response = self.client.get(&entry.file_url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            warn!(
                "Failed to download bulletin for {}: {} returned {}",
                entry.trade_date,
                entry.file_url,
                response.status()
            );
            return Err(anyhow!(
                "bulletin download for {} returned {}",
                entry.trade_date,
                response.status()
            ));
        }

        let bytes = response.bytes().await?;
        let path = bulletin_path(&self.data_dir, entry.trade_date);
        tokio::fs::write(&path, &bytes).await?;
        info!(
            "Downloaded bulletin for {} ({} bytes) to {}",
            entry.trade_date,
            bytes.len(),
            path.display()
        );

        Ok(path)
    }
}
