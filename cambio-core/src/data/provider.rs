//! Rate source trait and structured error types.
//!
//! The RateSource trait abstracts over where rates come from (the Frankfurter
//! API, the x-rates.com table) so the collector can run any ordered list of
//! sources and tests can substitute canned ones.

use crate::domain::RateRecord;
use thiserror::Error;

/// Transport and HTTP-level failures, plus the "nothing usable" outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout while requesting {url}")]
    Timeout { url: String },

    #[error("connection failed for {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("HTTP {code} from {url}")]
    HttpStatus { code: u16, url: String },

    #[error("source returned no valid rates")]
    EmptyResult,

    #[error("unexpected error requesting {url}: {reason}")]
    Unknown { url: String, reason: String },
}

impl FetchError {
    /// Classify a reqwest failure. Timeouts win over connection errors, since a
    /// connect timeout reports both.
    pub fn from_transport(err: &reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::ConnectionFailed {
                url,
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus {
                code: status.as_u16(),
                url,
            }
        } else {
            FetchError::Unknown {
                url,
                reason: err.to_string(),
            }
        }
    }
}

/// Payload shape problems.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response has no 'rates' object")]
    MissingRates,

    #[error("invalid CSS selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Any adapter-level failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Trait for exchange-rate sources.
///
/// Implementations own their own failure policy: a source may report an error
/// or, when absence of data is routine for it, an empty list.
pub trait RateSource: Send + Sync {
    /// Tag used in logs, the audit file, and the `source` column.
    fn name(&self) -> &str;

    /// Collect rates quoted against `base`.
    fn fetch(&self, base: &str) -> Result<Vec<RateRecord>, SourceError>;
}
