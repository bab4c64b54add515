use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row of a trading-results bulletin, keyed in practice by
/// (instrument code, trade date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Option<i64>,
    /// Exchange-assigned compound identifier, e.g. "A100ANK060F".
    pub instrument_code: String,
    pub instrument_name: String,
    /// First 4 characters of `instrument_code`.
    pub oil_id: String,
    /// Characters 5-7 of `instrument_code`.
    pub delivery_basis_id: String,
    pub delivery_basis_name: String,
    /// Last character of `instrument_code`.
    pub delivery_type_id: String,
    /// Contract volume in metric tons.
    pub volume: f64,
    /// Monetary total in rubles.
    pub total: f64,
    pub contract_count: i64,
    pub trade_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bulletin link discovered on the listing, with the trade date parsed
/// out of the 14-digit timestamp embedded in the file URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub trade_date: NaiveDate,
    pub file_url: String,
}

/// Outcome of processing a single trade date. A skipped date never aborts
/// the batch; the collector logs the reason and moves to the next entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DateOutcome {
    /// Records were extracted and persisted; carries the row count.
    Loaded(usize),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The bulletin file could not be downloaded (non-200 or transport error).
    DownloadFailed,
    /// No file exists at the deterministic path for this date.
    FileMissing,
    /// The metric-ton marker row was not found in the spreadsheet.
    MarkerNotFound,
    /// The file could not be read as a spreadsheet, or the header row was
    /// malformed.
    Unreadable,
    /// The table was located but no row passed the inclusion filter.
    NoQualifyingRows,
    /// The batch insert failed and was rolled back.
    PersistFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DownloadFailed => write!(f, "download failed"),
            SkipReason::FileMissing => write!(f, "bulletin file missing"),
            SkipReason::MarkerNotFound => write!(f, "marker row not found"),
            SkipReason::Unreadable => write!(f, "bulletin file unreadable"),
            SkipReason::NoQualifyingRows => write!(f, "no qualifying rows"),
            SkipReason::PersistFailed => write!(f, "batch insert rolled back"),
        }
    }
}

/// Configuration for the loader.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub base_url: String,
    pub data_dir: String,
    pub min_date: NaiveDate,
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let min_date_str =
            std::env::var("MIN_DATE").unwrap_or_else(|_| "2023-01-01".to_string());
        let min_date = NaiveDate::parse_from_str(&min_date_str, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("MIN_DATE is not a valid YYYY-MM-DD date: {}", e))?;

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "spimex.db".to_string()),
            base_url: std::env::var("SPIMEX_BASE_URL").unwrap_or_else(|_| {
                "https://spimex.com/markets/oil_products/trades/results/".to_string()
            }),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            min_date,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}
