//! Collection orchestrator — run every source, keep what succeeded.
//!
//! Sources run one after another. A failing source (an error, or a success
//! with nothing in it) is logged, audited, and reported, and the next source
//! still runs. The run only fails outright when no source produced anything,
//! or when the output cannot be written.

use anyhow::Result;
use cambio_core::data::{
    create_client, normalize_all, FrankfurterSource, RateSource, RetryPolicy, XRatesSource,
};
use cambio_core::domain::RateRecord;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::audit::FailureAudit;
use crate::config::CollectorConfig;
use crate::export::{RecordSink, SinkError};

/// Message recorded for a source that answered with no rates.
pub const EMPTY_SOURCE_MESSAGE: &str = "source returned no rates";

/// Errors that end a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("no data from any source ({} failed)", failures.len())]
    NoData { failures: Vec<SourceFailure> },

    #[error("failed to write output: {0}")]
    Sink(#[from] SinkError),
}

/// A source that produced records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSuccess {
    pub source: String,
    pub count: usize,
}

/// A source that failed or produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// Outcome of one pass over all sources.
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub records: Vec<RateRecord>,
    pub successes: Vec<SourceSuccess>,
    pub failures: Vec<SourceFailure>,
}

impl CollectionReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_data(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Summary of a run that wrote output.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: CollectionReport,
    pub rows_written: usize,
}

/// Query every source for `base`, in order, and gather the results.
///
/// Never fails: per-source failures are logged, sent to `audit`, and listed in
/// the report.
pub fn collect_rates(
    sources: &[&dyn RateSource],
    base: &str,
    audit: &dyn FailureAudit,
) -> CollectionReport {
    let mut report = CollectionReport::default();

    for source in sources {
        let name = source.name();
        info!(source = %name, %base, "collecting");

        let message = match source.fetch(base) {
            Ok(records) if !records.is_empty() => {
                info!(source = %name, count = records.len(), "source succeeded");
                report.successes.push(SourceSuccess {
                    source: name.to_string(),
                    count: records.len(),
                });
                report.records.extend(records);
                continue;
            }
            Ok(_) => EMPTY_SOURCE_MESSAGE.to_string(),
            Err(e) => e.to_string(),
        };

        error!(source = %name, "source failed: {message}");
        if let Err(e) = audit.record(name, &message) {
            warn!(source = %name, error = %e, "could not record failure in audit log");
        }
        report.failures.push(SourceFailure {
            source: name.to_string(),
            message,
        });
    }

    report
}

/// Collect from every source, normalize, and hand the rows to `sink`.
///
/// Fails with [`CollectError::NoData`] when every source came back empty, in
/// which case nothing is written.
pub fn run_collection(
    sources: &[&dyn RateSource],
    base: &str,
    audit: &dyn FailureAudit,
    sink: &dyn RecordSink,
) -> Result<RunSummary, CollectError> {
    let report = collect_rates(sources, base, audit);

    if !report.has_data() {
        error!(%base, failed = report.failures.len(), "no data from any source");
        return Err(CollectError::NoData {
            failures: report.failures,
        });
    }

    let rows = normalize_all(report.records.iter().cloned());
    let rows_written = sink.write(&rows)?;

    info!(
        rows = rows_written,
        succeeded = report.successes.len(),
        failed = report.failures.len(),
        "collection complete"
    );
    Ok(RunSummary {
        report,
        rows_written,
    })
}

/// The production sources, API first: Frankfurter with retries, then x-rates.com.
pub fn build_sources(config: &CollectorConfig) -> Result<(FrankfurterSource, XRatesSource)> {
    let api_client = create_client(config.api.retry.to_policy(), &config.api.user_agent)?;
    let api = FrankfurterSource::new(api_client)
        .with_base_url(config.api.url.clone())
        .with_timeout(config.api.timeout());

    let site_client = create_client(RetryPolicy::none(), &config.site.user_agent)?;
    let site = XRatesSource::with_client(site_client)
        .with_base_url(config.site.url.clone())
        .with_timeout(config.site.timeout());

    Ok((api, site))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambio_core::data::{FetchError, SourceError};
    use std::cell::RefCell;

    struct Canned {
        name: &'static str,
        outcome: fn() -> Result<Vec<RateRecord>, SourceError>,
    }

    impl RateSource for Canned {
        fn name(&self) -> &str {
            self.name
        }
        fn fetch(&self, _base: &str) -> Result<Vec<RateRecord>, SourceError> {
            (self.outcome)()
        }
    }

    #[derive(Default)]
    struct Recorded(RefCell<Vec<(String, String)>>);

    impl FailureAudit for Recorded {
        fn record(&self, source: &str, message: &str) -> Result<()> {
            self.0.borrow_mut().push((source.into(), message.into()));
            Ok(())
        }
    }

    struct Broken;

    impl FailureAudit for Broken {
        fn record(&self, _: &str, _: &str) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn one_rate() -> Result<Vec<RateRecord>, SourceError> {
        Ok(vec![RateRecord::new(
            cambio_core::domain::utc_now(),
            "canned",
            "USD",
            "EUR",
            0.9,
        )
        .unwrap()])
    }

    #[test]
    fn empty_success_counts_as_failure() {
        let empty = Canned {
            name: "empty",
            outcome: || Ok(Vec::new()),
        };
        let audit = Recorded::default();
        let report = collect_rates(&[&empty as &dyn RateSource], "USD", &audit);

        assert!(!report.has_data());
        assert_eq!(report.failures[0].message, EMPTY_SOURCE_MESSAGE);
        assert_eq!(audit.0.borrow().len(), 1);
    }

    #[test]
    fn failure_does_not_stop_later_sources() {
        let failing = Canned {
            name: "down",
            outcome: || Err(FetchError::EmptyResult.into()),
        };
        let working = Canned {
            name: "up",
            outcome: one_rate,
        };
        let audit = Recorded::default();
        let report = collect_rates(&[&failing as &dyn RateSource, &working], "USD", &audit);

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.successes, vec![SourceSuccess { source: "up".into(), count: 1 }]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "down");
        assert!(!report.all_succeeded());
    }

    #[test]
    fn audit_errors_are_swallowed() {
        let failing = Canned {
            name: "down",
            outcome: || Err(FetchError::EmptyResult.into()),
        };
        let report = collect_rates(&[&failing as &dyn RateSource], "USD", &Broken);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn build_sources_uses_config() {
        let config = CollectorConfig::default();
        let (api, site) = build_sources(&config).unwrap();
        assert_eq!(api.name(), "api_frankfurter");
        assert_eq!(site.name(), "xrates_site");
    }
}
