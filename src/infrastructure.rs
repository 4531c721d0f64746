//! Infrastructure layer for HTTP access, persistence and external tooling
//!
//! Concrete implementations behind the domain seams: the rate-limited API
//! client and XML envelope, the SQLite store adapter, the file-backed
//! progress cursor, plus configuration, logging, reporting and the schema
//! diagram generator.

pub mod config;
pub mod envelope;
pub mod erd;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod progress_file;
pub mod report;
pub mod trade_repository;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, ConfigManager, defaults, molit};
pub use envelope::{ResponseEnvelope, parse_envelope};
pub use fetcher::MolitTradeFetcher;
pub use http::{ApiClient, ApiClientConfig};
pub use logging::init_logging;
pub use progress_file::FileProgressStore;
pub use report::summary_report;
pub use trade_repository::{
    DistrictPyStat, DistrictTradeStat, MonthlyTradeCount, SqliteTradeRepository,
};
