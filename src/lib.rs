//! atam - Apartment Trade Archive Manager
//!
//! Resumable harvester for Korean apartment-sale transaction records from
//! the MOLIT open-data API. Fetches month-by-district pages, normalizes
//! each record against a district reference table and persists them into
//! SQLite, with a durable cursor so an interrupted run resumes exactly
//! where it stopped.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the pieces a binary or integration test wires together
pub use application::{HarvestConfig, HarvestSummary, Harvester};
pub use domain::{
    DateBucket, District, DistrictDirectory, KeyRing, ProgressCursor, ProgressStore, TradeQuery,
    TradeRecord, month_range,
};
pub use infrastructure::{
    ApiClient, ApiClientConfig, AppConfig, ConfigManager, FileProgressStore, MolitTradeFetcher,
    SqliteTradeRepository, init_logging,
};
