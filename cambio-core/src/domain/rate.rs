//! RateRecord — the canonical exchange-rate observation.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Source tag for records produced by the Frankfurter API adapter.
pub const SOURCE_API_FRANKFURTER: &str = "api_frankfurter";

/// Source tag for records produced by the x-rates.com table scraper.
pub const SOURCE_XRATES_SITE: &str = "xrates_site";

/// Errors raised while constructing a record.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("exchange rate must be finite, got {0}")]
    NonFiniteRate(f64),

    #[error("exchange rate must be positive, got {0}")]
    NonPositiveRate(f64),
}

/// One observed conversion factor from `base` to `target`.
///
/// Fields are private: a record is validated once at construction and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    timestamp: DateTime<Utc>,
    source: String,
    base: String,
    target: String,
    rate: f64,
}

impl RateRecord {
    /// Build a record, rejecting non-finite and non-positive rates.
    ///
    /// The timestamp is truncated to whole seconds.
    pub fn new(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        base: impl Into<String>,
        target: impl Into<String>,
        rate: f64,
    ) -> Result<Self, RecordError> {
        if !rate.is_finite() {
            return Err(RecordError::NonFiniteRate(rate));
        }
        if rate <= 0.0 {
            return Err(RecordError::NonPositiveRate(rate));
        }
        Ok(Self {
            timestamp: timestamp.trunc_subsecs(0),
            source: source.into(),
            base: base.into(),
            target: target.into(),
            rate,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Canonical loose form: the five fields keyed by name, timestamp as
    /// RFC 3339 text.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("timestamp".into(), Value::String(format_timestamp(self.timestamp)));
        fields.insert("source".into(), Value::String(self.source.clone()));
        fields.insert("base".into(), Value::String(self.base.clone()));
        fields.insert("target".into(), Value::String(self.target.clone()));
        fields.insert("rate".into(), Value::from(self.rate));
        fields
    }
}

/// Current UTC time at second precision.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Standard textual form used wherever a timestamp leaves the typed world.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
