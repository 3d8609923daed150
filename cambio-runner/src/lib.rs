//! cambio runner — collection orchestration, configuration, and output.
//!
//! This crate builds on `cambio-core` to provide:
//! - TOML configuration with defaults for every setting
//! - The collector that runs all sources and tolerates partial failure
//! - The `;`-delimited CSV sink for normalized rates
//! - The failure audit log

pub mod audit;
pub mod collect;
pub mod config;
pub mod export;

pub use audit::{CsvAuditLog, FailureAudit};
pub use collect::{
    build_sources, collect_rates, run_collection, CollectError, CollectionReport, RunSummary,
    SourceFailure, SourceSuccess,
};
pub use config::{CollectorConfig, ConfigError};
pub use export::{CsvSink, RecordSink, SinkError, WriteMode};
