//! CSV sink — persist normalized rates for spreadsheet consumers.
//!
//! Output layout:
//! - `;` delimiter, UTF-8 with a byte-order mark (spreadsheets in pt-BR
//!   locales need both to open the file correctly)
//! - columns `data;origem;base;moeda;cotação`
//! - `data` as `dd/mm/YYYY`, `cotação` rounded to 4 decimals
//! - absent values as empty cells

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cambio_core::data::NormalizedFields;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Persisted column names, in order.
pub const RATE_COLUMNS: [&str; 5] = ["data", "origem", "base", "moeda", "cotação"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors from writing delimited output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Whether a write replaces the file or adds to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// Destination for normalized rate rows.
pub trait RecordSink {
    /// Persist `records`, returning how many rows were written.
    fn write(&self, records: &[NormalizedFields]) -> Result<usize, SinkError>;
}

/// `;`-delimited rate file.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}

impl RecordSink for CsvSink {
    fn write(&self, records: &[NormalizedFields]) -> Result<usize, SinkError> {
        if records.is_empty() {
            warn!(path = %self.path.display(), "no rows to save");
            return Ok(0);
        }

        let mut wtr = open_delimited(&self.path, self.mode, &RATE_COLUMNS)?;
        for fields in records {
            wtr.write_record(render_row(fields))
                .map_err(|source| csv_error(&self.path, source))?;
        }
        wtr.flush().map_err(|source| io_error(&self.path, source))?;

        info!(rows = records.len(), path = %self.path.display(), "saved rates");
        Ok(records.len())
    }
}

/// One output row in `RATE_COLUMNS` order.
pub fn render_row(fields: &NormalizedFields) -> [String; 5] {
    [
        format_date(&fields.timestamp).unwrap_or_default(),
        fields.source.clone().unwrap_or_default(),
        fields.base.clone().unwrap_or_default(),
        fields.target.clone().unwrap_or_default(),
        fields
            .rate
            .map(|r| format!("{:.4}", round_rate(r)))
            .unwrap_or_default(),
    ]
}

/// Round to 4 decimal places. Values too large to scale are returned as-is.
pub fn round_rate(rate: f64) -> f64 {
    let scaled = rate * 10_000.0;
    if !scaled.is_finite() {
        return rate;
    }
    scaled.round() / 10_000.0
}

/// Reformat a textual timestamp as `dd/mm/YYYY`.
///
/// Accepts RFC 3339, ISO date-times with `T` or a space separator (optional
/// fraction), and bare `YYYY-MM-DD`. Returns `None` for anything else.
pub fn format_date(timestamp: &str) -> Option<String> {
    parse_calendar_date(timestamp).map(|d| d.format("%d/%m/%Y").to_string())
}

fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Open a `;`-delimited file for writing.
///
/// BOM and `header` are written when the file is truncated (`Overwrite`) or is
/// new/empty (`Append`). Parent directories are created as needed.
pub(crate) fn open_delimited(
    path: &Path,
    mode: WriteMode,
    header: &[&str],
) -> Result<csv::Writer<File>, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    let mut file = match mode {
        WriteMode::Overwrite => File::create(path),
        WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
    }
    .map_err(|source| io_error(path, source))?;

    let is_empty = file
        .metadata()
        .map_err(|source| io_error(path, source))?
        .len()
        == 0;
    if is_empty {
        file.write_all(UTF8_BOM)
            .map_err(|source| io_error(path, source))?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        wtr.write_record(header)
            .map_err(|source| csv_error(path, source))?;
    }
    Ok(wtr)
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> SinkError {
    SinkError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
