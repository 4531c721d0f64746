//! Configuration infrastructure
//!
//! JSON-file configuration with a managed lifecycle: a missing file is
//! created from defaults, an unreadable one is backed up and reset, and the
//! loaded result is validated before any work starts. Fatal configuration
//! problems surface here and nowhere else.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub crawl: CrawlConfig,
    pub logging: LoggingConfig,
}

/// Store connection and reference-data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,

    /// District reference CSV imported on `init`.
    pub district_csv: PathBuf,
}

/// Upstream API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Trade endpoint base URL.
    pub endpoint: String,

    /// One or more service keys, rotated round-robin. Keys issued by the
    /// portal are already URL-encoded and are sent verbatim.
    pub service_keys: Vec<String>,

    /// Per-key daily call allowance.
    pub daily_call_cap: u32,

    /// Row cap per request.
    pub page_size: u32,

    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Harvest range and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// First harvested year (from January).
    pub start_year: i32,

    /// Last harvested year (through December).
    pub end_year: i32,

    /// Delay between consecutive API calls in milliseconds.
    pub request_delay_ms: u64,

    /// Where the resume cursor is persisted.
    pub progress_path: PathBuf,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable daily-rotated file output alongside the console.
    pub file_output: bool,

    /// Directory for log files.
    pub log_dir: PathBuf,

    /// Per-module level overrides, e.g. `"atam::infrastructure" -> "debug"`.
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: defaults::DATABASE_URL.to_string(),
                district_csv: PathBuf::from(defaults::DISTRICT_CSV),
            },
            api: ApiConfig {
                endpoint: molit::TRADE_ENDPOINT.to_string(),
                service_keys: Vec::new(),
                daily_call_cap: defaults::DAILY_CALL_CAP,
                page_size: defaults::PAGE_SIZE,
                timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            },
            crawl: CrawlConfig {
                start_year: defaults::START_YEAR,
                end_year: defaults::END_YEAR,
                request_delay_ms: defaults::REQUEST_DELAY_MS,
                progress_path: PathBuf::from(defaults::PROGRESS_PATH),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_output: true,
                log_dir: PathBuf::from(defaults::LOG_DIR),
                module_filters: HashMap::new(),
            },
        }
    }
}

/// Startup-fatal configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no service keys configured (api.service_keys is empty)")]
    EmptyServiceKeys,

    #[error("invalid year range: start_year {start} is after end_year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("invalid API endpoint {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },
}

impl AppConfig {
    /// Checks every startup-fatal invariant at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.service_keys.is_empty() {
            return Err(ConfigError::EmptyServiceKeys);
        }
        if self.crawl.start_year > self.crawl.end_year {
            return Err(ConfigError::InvalidYearRange {
                start: self.crawl.start_year,
                end: self.crawl.end_year,
            });
        }
        if self.api.daily_call_cap == 0 {
            return Err(ConfigError::ZeroValue {
                field: "api.daily_call_cap",
            });
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "api.page_size",
            });
        }
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ZeroValue {
                field: "api.timeout_seconds",
            });
        }
        if self.crawl.request_delay_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "crawl.request_delay_ms",
            });
        }
        url::Url::parse(&self.api.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            url: self.api.endpoint.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Loads and persists [`AppConfig`] at a fixed path.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file, creating a default one if missing.
    ///
    /// An unparseable file is backed up next to itself with a `.corrupted`
    /// suffix and replaced by defaults rather than aborting startup.
    pub async fn load(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(path = ?self.config_path, "Configuration file not found, creating default");
            let default_config = AppConfig::default();
            self.save(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!(path = ?self.config_path, "Loaded configuration");
                Ok(config)
            }
            Err(parse_error) => {
                warn!(%parse_error, "⚠️ Configuration file unreadable, resetting to defaults");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to back up corrupted config: {e}");
                } else {
                    info!(backup = ?backup_path, "Backed up corrupted config");
                }

                let default_config = AppConfig::default();
                self.save(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Saves configuration, creating parent directories as needed.
    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!(path = ?self.config_path, "Saved configuration");
        Ok(())
    }
}

/// MOLIT apartment-trade open API constants.
pub mod molit {
    /// Apartment sale (매매) transaction endpoint.
    pub const TRADE_ENDPOINT: &str =
        "https://apis.data.go.kr/1613000/RTMSDataSvcAptTrade/getRTMSDataSvcAptTrade";

    /// Envelope result code for a successful response.
    pub const RESULT_OK: &str = "00";
}

/// Configuration defaults.
pub mod defaults {
    /// Default SQLite database URL.
    pub const DATABASE_URL: &str = "sqlite:data/atam.db";

    /// Default district reference CSV path.
    pub const DISTRICT_CSV: &str = "docs/district_code/district_code.csv";

    /// Default progress-cursor file path.
    pub const PROGRESS_PATH: &str = "data/progress.json";

    /// Default log directory.
    pub const LOG_DIR: &str = "logs";

    /// Default delay between requests in milliseconds.
    pub const REQUEST_DELAY_MS: u64 = 100;

    /// Default per-key daily call allowance.
    pub const DAILY_CALL_CAP: u32 = 1_000;

    /// Default row cap per request; exceeds any observed district/month
    /// transaction count.
    pub const PAGE_SIZE: u32 = 10_000;

    /// Default request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default harvest range.
    pub const START_YEAR: i32 = 2020;
    pub const END_YEAR: i32 = 2024;
}
