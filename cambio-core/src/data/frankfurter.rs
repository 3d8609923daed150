//! Frankfurter API rate source.
//!
//! Fetches `/latest?from={BASE}` and turns the `rates` object into records.
//! Individual bad entries are logged and skipped; a response that yields no
//! record at all is a hard failure (`FetchError::EmptyResult`), so callers can
//! tell "reachable but useless" apart from a real empty answer.

use super::http::HttpClient;
use super::provider::{FetchError, FormatError, RateSource, SourceError};
use crate::domain::{utc_now, RateRecord, SOURCE_API_FRANKFURTER};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Public Frankfurter endpoint.
pub const FRANKFURTER_URL: &str = "https://api.frankfurter.app";

/// Frankfurter API data source.
#[derive(Debug, Clone)]
pub struct FrankfurterSource {
    client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl FrankfurterSource {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: FRANKFURTER_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point the source at another host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn latest_url(&self, base: &str) -> String {
        format!("{}/latest?from={base}", self.base_url.trim_end_matches('/'))
    }

    /// Fetch the latest rates for `base`.
    pub fn fetch_rates(&self, base: &str) -> Result<Vec<RateRecord>, SourceError> {
        let url = self.latest_url(base);
        info!(%base, %url, "fetching API rates");

        let body = self.download(&url)?;
        let records = Self::parse_latest(&body, base)?;

        info!(count = records.len(), "API rates processed");
        Ok(records)
    }

    /// GET the document and return its body, classifying every failure.
    fn download(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url, self.timeout).map_err(|e| {
            let err = FetchError::from_transport(&e, url);
            error!(error = %e, "API request failed: {err}");
            err
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(%url, %status, "API returned an error status");
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| {
            let err = FetchError::from_transport(&e, url);
            error!(error = %e, "failed reading API response body: {err}");
            err
        })
    }

    /// Parse a `/latest` response body into records.
    ///
    /// `requested_base` is only used when the body omits its own `base` field.
    pub fn parse_latest(body: &str, requested_base: &str) -> Result<Vec<RateRecord>, SourceError> {
        let doc: Value = serde_json::from_str(body).map_err(|e| {
            error!(error = %e, "API response is not valid JSON");
            FormatError::NotJson(e.to_string())
        })?;

        let rates = doc.get("rates").and_then(Value::as_object).ok_or_else(|| {
            error!(response = %doc, "API response has no usable 'rates' object");
            FormatError::MissingRates
        })?;

        let timestamp = parse_report_date(doc.get("date"));

        let base = match doc.get("base").and_then(Value::as_str) {
            Some(b) => b.to_string(),
            None => {
                warn!(%requested_base, "API response has no 'base'; using requested base");
                requested_base.to_string()
            }
        };

        let mut records = Vec::with_capacity(rates.len());
        for (code, value) in rates {
            let Some(rate) = coerce_rate(value) else {
                warn!(currency = %code, %value, "skipping non-numeric rate");
                continue;
            };
            match RateRecord::new(timestamp, SOURCE_API_FRANKFURTER, &base, code, rate) {
                Ok(record) => records.push(record),
                Err(e) => warn!(currency = %code, error = %e, "skipping invalid rate"),
            }
        }

        if records.is_empty() {
            warn!("API response produced no valid rate records");
            return Err(FetchError::EmptyResult.into());
        }

        Ok(records)
    }
}

/// Reported `date` (`YYYY-MM-DD`) at midnight UTC, or now when absent/unparsable.
fn parse_report_date(date: Option<&Value>) -> DateTime<Utc> {
    let raw = match date.and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => {
            warn!("API response has no 'date'; using current UTC time");
            return utc_now();
        }
    };

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(day) => day.and_time(NaiveTime::MIN).and_utc(),
        Err(e) => {
            warn!(date = %raw, error = %e, "unparsable 'date'; using current UTC time");
            utc_now()
        }
    }
}

/// JSON numbers and numeric strings; everything else is rejected.
fn coerce_rate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => {
            debug!(%value, "rate value has unsupported JSON type");
            None
        }
    }
}

impl RateSource for FrankfurterSource {
    fn name(&self) -> &str {
        SOURCE_API_FRANKFURTER
    }

    fn fetch(&self, base: &str) -> Result<Vec<RateRecord>, SourceError> {
        self.fetch_rates(base)
    }
}
