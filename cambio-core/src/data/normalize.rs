//! Record normalization — homogenize loosely-shaped rate inputs.
//!
//! Inputs arrive as typed [`RateRecord`]s, as JSON-like mappings (e.g. rows
//! read back from elsewhere), or as arbitrary serializable objects. All of
//! them are reduced to [`NormalizedFields`], which always carries the five
//! canonical fields. Normalization never fails: anything unrecoverable becomes
//! `None`.

use crate::domain::{format_timestamp, utc_now, RateRecord};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// A loosely-shaped record awaiting normalization.
#[derive(Debug, Clone)]
pub enum RecordLike {
    /// Already canonical; normalized through [`RateRecord::to_fields`].
    Canonical(RateRecord),
    /// Field-name → value mapping.
    Mapping(Map<String, Value>),
    /// Any attribute-bearing value. Only JSON objects contribute fields.
    Object(Value),
}

impl RecordLike {
    /// Capture the public fields of any serializable value.
    pub fn from_attributes<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => RecordLike::Object(v),
            Err(e) => {
                debug!(error = %e, "value could not be serialized; treating as empty");
                RecordLike::Object(Value::Null)
            }
        }
    }

    fn into_fields(self) -> Map<String, Value> {
        match self {
            RecordLike::Canonical(record) => record.to_fields(),
            RecordLike::Mapping(map) => map,
            RecordLike::Object(Value::Object(map)) => map,
            RecordLike::Object(_) => Map::new(),
        }
    }
}

impl From<RateRecord> for RecordLike {
    fn from(record: RateRecord) -> Self {
        RecordLike::Canonical(record)
    }
}

impl From<Map<String, Value>> for RecordLike {
    fn from(map: Map<String, Value>) -> Self {
        RecordLike::Mapping(map)
    }
}

/// The five canonical fields, with `None` as the absent marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFields {
    /// Textual timestamp as supplied, or the normalization time (RFC 3339).
    pub timestamp: String,
    pub source: Option<String>,
    pub base: Option<String>,
    pub target: Option<String>,
    pub rate: Option<f64>,
}

/// Normalize one record. Never fails.
pub fn normalize(item: RecordLike) -> NormalizedFields {
    let mut fields = item.into_fields();

    if !fields.contains_key("target") {
        if let Some(currency) = fields.remove("currency") {
            fields.insert("target".into(), currency);
        }
    }

    let rate = fields.get("rate").and_then(coerce_rate);

    let timestamp = match fields.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => format_timestamp(utc_now()),
        Some(Value::String(_)) => format_timestamp(utc_now()),
        Some(other) => other.to_string(),
    };

    NormalizedFields {
        timestamp,
        source: text_field(&fields, "source"),
        base: text_field(&fields, "base"),
        target: text_field(&fields, "target"),
        rate,
    }
}

/// Normalize a batch, preserving order.
pub fn normalize_all<I>(items: I) -> Vec<NormalizedFields>
where
    I: IntoIterator,
    I::Item: Into<RecordLike>,
{
    items.into_iter().map(|item| normalize(item.into())).collect()
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn coerce_rate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => coerce_locale_number(s).or_else(|| s.trim().parse::<f64>().ok()),
        _ => None,
    };
    parsed.filter(|r| r.is_finite())
}

/// Parse numeric text written with `.` as thousands separator and `,` as
/// decimal separator (`"1.234,56"` → `1234.56`).
///
/// Caution: a plain `"1234.5"` reads as `12345.0` here, since every `.` is
/// taken for a thousands separator. Only textual rates go through this path.
pub fn coerce_locale_number(text: &str) -> Option<f64> {
    text.trim()
        .replace('.', "")
        .replace(',', ".")
        .parse::<f64>()
        .ok()
}
