//! cambio CLI — collect exchange rates and inspect configuration.
//!
//! Commands:
//! - `collect` — query the API and the site, write `;`-delimited CSV
//! - `rates` — fetch the API only and print each rate
//! - `config` — print the effective configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cambio_core::data::RateSource;
use cambio_runner::{
    build_sources, run_collection, CollectError, CollectorConfig, CsvAuditLog, CsvSink,
    WriteMode,
};

#[derive(Parser)]
#[command(name = "cambio", about = "cambio — exchange-rate collector")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect rates from every source and save them as CSV.
    Collect {
        /// Base currency (e.g., USD). Overrides the config.
        #[arg(long)]
        base: Option<String>,

        /// Output CSV path. Overrides the config.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append to the output instead of replacing it.
        #[arg(long, default_value_t = false)]
        append: bool,

        /// Failure audit CSV path. Overrides the config.
        #[arg(long)]
        audit: Option<PathBuf>,
    },
    /// Fetch API rates and print them.
    Rates {
        /// Base currency (e.g., USD). Overrides the config.
        #[arg(long)]
        base: Option<String>,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Collect {
            base,
            output,
            append,
            audit,
        } => run_collect(config, base, output, append, audit),
        Commands::Rates { base } => run_rates(&config, base),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// `RUST_LOG` picks the level (default `info`); `CAMBIO_LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let log_format = std::env::var("CAMBIO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<CollectorConfig> {
    match path {
        Some(path) => {
            let config = CollectorConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(CollectorConfig::default()),
    }
}

fn run_collect(
    mut config: CollectorConfig,
    base: Option<String>,
    output: Option<PathBuf>,
    append: bool,
    audit: Option<PathBuf>,
) -> Result<()> {
    if let Some(base) = base {
        config.base_currency = base.trim().to_uppercase();
    }
    if let Some(output) = output {
        config.output.path = output;
    }
    if append {
        config.output.mode = WriteMode::Append;
    }
    if let Some(audit) = audit {
        config.audit.path = audit;
    }
    config.validate()?;

    let (api, site) = build_sources(&config)?;
    let audit_log = CsvAuditLog::new(&config.audit.path);
    let sink = CsvSink::new(&config.output.path, config.output.mode);

    let sources: [&dyn RateSource; 2] = [&api, &site];

    match run_collection(&sources, &config.base_currency, &audit_log, &sink) {
        Ok(summary) => {
            println!(
                "Saved {} rows to {}",
                summary.rows_written,
                config.output.path.display()
            );
            for failure in &summary.report.failures {
                eprintln!("Warning: {} failed: {}", failure.source, failure.message);
            }
            Ok(())
        }
        Err(CollectError::NoData { failures }) => {
            for failure in &failures {
                eprintln!("Error for {}: {}", failure.source, failure.message);
            }
            eprintln!(
                "No data collected. Failures recorded in {}",
                config.audit.path.display()
            );
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_rates(config: &CollectorConfig, base: Option<String>) -> Result<()> {
    let base = base
        .map(|b| b.trim().to_uppercase())
        .unwrap_or_else(|| config.base_currency.clone());
    let (api, _) = build_sources(config)?;

    let records = api
        .fetch(&base)
        .with_context(|| format!("failed to fetch rates for {base}"))?;

    for record in &records {
        println!(
            "{} → {}: {:.4} | Data: {}",
            record.base(),
            record.target(),
            record.rate(),
            record.timestamp().format("%Y-%m-%d")
        );
    }
    Ok(())
}
