//! x-rates.com rate table scraper.
//!
//! The site publishes an HTML table of current rates for a base currency. Its
//! markup is outside our control, so every failure here (network, HTTP,
//! missing table, bad rows) degrades to "nothing found": the scraper logs and
//! returns an empty list instead of an error.

use super::http::{create_client, HttpClient, RetryPolicy};
use super::provider::{FetchError, FormatError, RateSource, SourceError};
use crate::domain::{utc_now, RateRecord, SOURCE_XRATES_SITE};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Public x-rates.com host.
pub const XRATES_URL: &str = "https://www.x-rates.com";

/// The site serves a reduced page to unknown agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

const TABLE_SELECTOR: &str = "table.tablesorter.ratesTable";
const ROW_SELECTOR: &str = "tbody tr";
const CELL_SELECTOR: &str = "td";

/// x-rates.com data source.
#[derive(Debug, Clone)]
pub struct XRatesSource {
    client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl XRatesSource {
    /// Direct (non-retrying) client with a browser-like `User-Agent`.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(create_client(
            RetryPolicy::none(),
            BROWSER_USER_AGENT,
        )?))
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            base_url: XRATES_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn table_url(&self, base: &str) -> String {
        format!(
            "{}/table/?from={base}&amount=1",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Scrape the rate table for `base`. Never fails; see module docs.
    pub fn scrape_rates(&self, base: &str) -> Vec<RateRecord> {
        let url = self.table_url(base);
        info!(%base, %url, "scraping rate table");

        let html = match self.download(&url) {
            Ok(html) => html,
            Err(e) => {
                error!(%url, "could not fetch rate table: {e}");
                return Vec::new();
            }
        };

        let records = parse_rates_table(&html, base, utc_now());
        info!(count = records.len(), "scraped rates");
        records
    }

    /// GET the page body. Failures are classified like the API's, but the
    /// caller only logs them.
    fn download(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url, self.timeout)
            .map_err(|e| FetchError::from_transport(&e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| FetchError::from_transport(&e, url))
    }
}

/// Parse the rate table out of an x-rates.com page.
///
/// Each body row contributes its first two cells (currency label, rate text).
/// Rows with fewer cells or unparsable rates are skipped. Every record is
/// stamped with `observed_at`, since the table carries no per-row date.
pub fn parse_rates_table(html: &str, base: &str, observed_at: DateTime<Utc>) -> Vec<RateRecord> {
    let (table_sel, row_sel, cell_sel) = match selectors() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid rate table selector");
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let Some(table) = document.select(&table_sel).next() else {
        warn!("rate table not found in page");
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in table.select(&row_sel) {
        let mut cells = row.select(&cell_sel);
        let (Some(label_cell), Some(rate_cell)) = (cells.next(), cells.next()) else {
            debug!("skipping row with fewer than two cells");
            continue;
        };

        let currency = cell_text(label_cell);
        let rate_text = cell_text(rate_cell).replace(',', "");
        let rate = match rate_text.parse::<f64>() {
            Ok(rate) => rate,
            Err(_) => {
                warn!(%currency, %rate_text, "could not parse rate");
                continue;
            }
        };

        match RateRecord::new(observed_at, SOURCE_XRATES_SITE, base, &currency, rate) {
            Ok(record) => records.push(record),
            Err(e) => warn!(%currency, error = %e, "skipping invalid rate"),
        }
    }

    records
}

fn selectors() -> Result<(Selector, Selector, Selector), FormatError> {
    let parse = |css: &str| {
        Selector::parse(css).map_err(|e| FormatError::InvalidSelector {
            selector: css.to_string(),
            reason: e.to_string(),
        })
    };
    Ok((
        parse(TABLE_SELECTOR)?,
        parse(ROW_SELECTOR)?,
        parse(CELL_SELECTOR)?,
    ))
}

/// Concatenated text of a cell, each fragment trimmed.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

impl RateSource for XRatesSource {
    fn name(&self) -> &str {
        SOURCE_XRATES_SITE
    }

    fn fetch(&self, base: &str) -> Result<Vec<RateRecord>, SourceError> {
        Ok(self.scrape_rates(base))
    }
}
