//! Collector configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock setup: base USD, Frankfurter with 3 retries, x-rates.com direct,
//! output to `data/output.csv`, failures to `data/erros.csv`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cambio_core::data::{
    RetryPolicy, BROWSER_USER_AGENT, DEFAULT_USER_AGENT, FRANKFURTER_URL, XRATES_URL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::WriteMode;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    /// Currency every source is queried against.
    pub base_currency: String,
    pub api: ApiConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    pub audit: AuditConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_currency: "USD".into(),
            api: ApiConfig::default(),
            site: SiteConfig::default(),
            output: OutputConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Frankfurter API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: FRANKFURTER_URL.into(),
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.into(),
            retry: RetryConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry policy in config-file units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            backoff_ms: policy.backoff_base.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            retryable_statuses: policy.retryable_statuses,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_ms),
            retryable_statuses: self.retryable_statuses.clone(),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// x-rates.com settings. The scraper never retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: XRATES_URL.into(),
            timeout_secs: 15,
            user_agent: BROWSER_USER_AGENT.into(),
        }
    }
}

impl SiteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rate output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub mode: WriteMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/output.csv"),
            mode: WriteMode::Overwrite,
        }
    }
}

/// Failure audit file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/erros.csv"),
        }
    }
}

impl CollectorConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_currency.trim().is_empty() {
            return Err(ConfigError::Invalid("base_currency must not be empty".into()));
        }
        if self.api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.url must not be empty".into()));
        }
        if self.site.url.trim().is_empty() {
            return Err(ConfigError::Invalid("site.url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 || self.site.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        if self.output.path.as_os_str().is_empty() || self.audit.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output and audit paths must be set".into()));
        }
        Ok(())
    }
}
