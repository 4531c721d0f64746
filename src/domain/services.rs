//! Fetch-side service contract.
//!
//! The run loop only ever sees a [`FetchOutcome`]; every failure mode of the
//! transport and envelope layers is folded into [`TransientError`] so a bad
//! month can be logged and skipped without unwinding the harvest.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::query::TradeQuery;
use crate::domain::trade::TradeRecord;

/// Recoverable per-unit failures. None of these abort the run; the unit is
/// recorded as failed and the cursor moves on.
#[derive(Debug, Error)]
pub enum TransientError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed response envelope: {0}")]
    Envelope(String),

    #[error("upstream result code {code}: {msg}")]
    ResultCode { code: String, msg: String },
}

/// What a single fetch unit produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Parsed and normalized records, ready for the store.
    Fetched {
        records: Vec<TradeRecord>,
        /// Count the envelope header claimed.
        declared_total: u32,
        /// Items discarded during normalization.
        dropped: u32,
    },
    /// The upstream answered cleanly with nothing usable for this unit:
    /// zero transactions, or a count that disagrees with the item list.
    Empty,
    Transient(TransientError),
}

/// Executes one bound query against the upstream with one service key.
///
/// Implementations own pacing below this seam (connection reuse, rate
/// ceiling); retry and rotation policy live above it in the run loop.
#[async_trait]
pub trait TradeFetcher: Send + Sync {
    async fn execute(&self, query: &TradeQuery, service_key: &str) -> FetchOutcome;
}

#[async_trait]
impl<F: TradeFetcher + ?Sized> TradeFetcher for std::sync::Arc<F> {
    async fn execute(&self, query: &TradeQuery, service_key: &str) -> FetchOutcome {
        (**self).execute(query, service_key).await
    }
}
