//! Domain module - core harvesting entities and service seams
//!
//! Everything here is transport- and storage-agnostic: districts, date
//! buckets, normalized trade records, the key ring, the progress cursor and
//! the traits the application layer drives. Concrete HTTP and SQLite
//! implementations live under `infrastructure`.

pub mod credential;
pub mod date_bucket;
pub mod district;
pub mod progress;
pub mod query;
pub mod repositories;
pub mod services;
pub mod trade;

// Re-export commonly used items for convenience
pub use credential::{CredentialError, KeyRing, ServiceKey};
pub use date_bucket::{DateBucket, month_range};
pub use district::{District, DistrictDirectory};
pub use progress::{InMemoryProgressStore, ProgressCursor, ProgressStore};
pub use query::TradeQuery;
pub use repositories::TradeWriter;
pub use services::{FetchOutcome, TradeFetcher, TransientError};
pub use trade::{ItemError, RawTradeItem, TradeRecord};
