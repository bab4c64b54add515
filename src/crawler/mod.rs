//! Crawling the paginated trading-results listing.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{Config, ListingEntry};

/// CSS classes the exchange puts on downloadable bulletin links.
const FILE_LINK_SELECTOR: &str = "a.accordeon-inner__item-title.link.xls";
/// Next-page control inside the Bitrix pagination block.
const NEXT_PAGE_SELECTOR: &str = ".bx-pag-next a";
/// Exact anchor text of the oil-products bulletin on the first page.
const BULLETIN_TITLE: &str = "Бюллетень по итогам торгов в Секции «Нефтепродукты»";

/// Walks the paginated listing and yields (trade date, file URL) pairs.
pub struct ListingCrawler {
    client: Client,
    base_url: Url,
}

/// What one listing page contributed to the crawl.
struct ParsedPage {
    entries: Vec<ListingEntry>,
    had_file_links: bool,
    next_page: Option<u32>,
}

impl ListingCrawler {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .user_agent("spimex-loader/0.1")
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self { client, base_url })
    }

    /// Collects all bulletin entries dated `min_date` or later.
    ///
    /// Crawling is best-effort: a non-200 page or a transport error halts
    /// the walk and returns everything accumulated so far. On each page the
    /// FIRST entry dated below `min_date` ends scanning of that page's
    /// remaining links (listings are date-descending, so this is a
    /// short-circuit, not a filter).
    pub async fn discover(&self, min_date: NaiveDate, max_pages: Option<u32>) -> Vec<ListingEntry> {
        let mut entries = Vec::new();
        let mut page_number: u32 = 1;
        let mut pages_visited: u32 = 0;

        loop {
            if let Some(max) = max_pages {
                if pages_visited >= max {
                    info!("Reached page limit ({}) after page {}", max, page_number);
                    break;
                }
            }

            let url = format!("{}?page=page-{}", self.base_url, page_number);
            let html = match self.get_page(&url).await {
                Some(html) => html,
                None => break,
            };
            pages_visited += 1;

            let page = parse_listing_page(&html, &self.base_url, min_date);
            if !page.had_file_links {
                info!("No file links on page {}", page_number);
                break;
            }
            debug!(
                "Page {}: {} entries within the date bound",
                page_number,
                page.entries.len()
            );
            entries.extend(page.entries);

            match page.next_page {
                Some(next) => {
                    info!("Moving to page {}", next);
                    page_number = next;
                }
                None => break,
            }
        }

        info!("Discovered {} bulletin entries", entries.len());
        entries
    }

    /// Looks up the single most recent oil-products bulletin on the first
    /// listing page by its exact anchor title, bypassing pagination and the
    /// date cutoff.
    pub async fn discover_latest(&self) -> Option<ListingEntry> {
        let html = self.get_page(self.base_url.as_str()).await?;
        let entry = parse_latest(&html, &self.base_url);
        match &entry {
            Some(e) => info!("Latest bulletin dated {}", e.trade_date),
            None => warn!("Bulletin link not found on the first listing page"),
        }
        entry
    }

    /// Fetches one listing page, treating any non-200 status or transport
    /// error as "nothing here".
    async fn get_page(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch listing page {}: {}", url, e);
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            warn!("Listing page {} returned {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to read listing page {}: {}", url, e);
                None
            }
        }
    }
}

/// Extracts dated file links and the next-page number from one listing page.
fn parse_listing_page(html: &str, base_url: &Url, min_date: NaiveDate) -> ParsedPage {
    let document = Html::parse_document(html);
    let file_links = Selector::parse(FILE_LINK_SELECTOR).expect("static selector");
    let next_page_link = Selector::parse(NEXT_PAGE_SELECTOR).expect("static selector");

    let anchors: Vec<_> = document.select(&file_links).collect();
    let had_file_links = !anchors.is_empty();

    let mut entries = Vec::new();
    for anchor in &anchors {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(file_url) = base_url.join(href) else {
            continue;
        };
        // Links without an embedded timestamp are ignored outright.
        let Some(trade_date) = trade_date_from_url(file_url.as_str()) else {
            continue;
        };
        if trade_date < min_date {
            // Date-descending listing: everything after this on the page is
            // older still.
            break;
        }
        entries.push(ListingEntry {
            trade_date,
            file_url: file_url.into(),
        });
    }

    let next_page = document
        .select(&next_page_link)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| {
            let number = next_page_number(href);
            if number.is_none() {
                // A next-page control we cannot read means we stop rather
                // than loop on the same page.
                warn!("Next-page control present but unreadable: {}", href);
            }
            number
        });

    ParsedPage {
        entries,
        had_file_links,
        next_page,
    }
}

/// Finds the anchor whose visible text is exactly the bulletin title.
fn parse_latest(html: &str, base_url: &Url) -> Option<ListingEntry> {
    let document = Html::parse_document(html);
    let file_links = Selector::parse(FILE_LINK_SELECTOR).expect("static selector");

    for anchor in document.select(&file_links) {
        let title: String = anchor.text().collect();
        if title.trim() != BULLETIN_TITLE {
            continue;
        }
        let href = anchor.value().attr("href")?;
        let file_url = base_url.join(href).ok()?;
        let trade_date = trade_date_from_url(file_url.as_str())?;
        return Some(ListingEntry {
            trade_date,
            file_url: file_url.into(),
        });
    }
    None
}

/// Parses the 14-digit `_YYYYMMDDHHMMSS.xls` timestamp out of a file URL,
/// truncated to a calendar date.
pub fn trade_date_from_url(url: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"_(\d{14})\.xls").expect("valid timestamp pattern"));

    let stamp = re.captures(url)?.get(1)?.as_str();
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.date())
}

/// Reads the page number out of a next-page href (`?page=page-N`).
fn next_page_number(href: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"page=page-(\d+)").expect("valid page pattern"));

    re.captures(href)?.get(1)?.as_str().parse().ok()
}
