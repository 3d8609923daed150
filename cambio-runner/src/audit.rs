//! Failure audit — append-only record of source failures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use crate::export::{open_delimited, WriteMode};

/// Audit file columns.
pub const AUDIT_COLUMNS: [&str; 3] = ["data", "origem", "mensagem"];

/// Receives one entry per failed source.
pub trait FailureAudit {
    fn record(&self, source: &str, message: &str) -> Result<()>;
}

/// `;`-delimited audit file, same conventions as the rate output.
#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    path: PathBuf,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureAudit for CsvAuditLog {
    fn record(&self, source: &str, message: &str) -> Result<()> {
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut wtr = open_delimited(&self.path, WriteMode::Append, &AUDIT_COLUMNS)
            .with_context(|| format!("failed to open audit log {}", self.path.display()))?;
        wtr.write_record([stamp.as_str(), source, message])
            .context("failed to write audit entry")?;
        wtr.flush().context("failed to flush audit log")?;

        warn!(path = %self.path.display(), %source, "failure recorded: {message}");
        Ok(())
    }
}
