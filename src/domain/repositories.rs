use async_trait::async_trait;

use crate::domain::trade::TradeRecord;

/// Write side of the trade store as the run loop sees it.
///
/// A failed insert is fatal to the harvest: the cursor is not confirmed past
/// a unit whose records never landed, so a restart re-fetches that unit.
#[async_trait]
pub trait TradeWriter: Send + Sync {
    /// Inserts a batch atomically and returns the number of rows written.
    async fn insert_trades(&self, records: &[TradeRecord]) -> anyhow::Result<u64>;
}

#[async_trait]
impl<W: TradeWriter + ?Sized> TradeWriter for std::sync::Arc<W> {
    async fn insert_trades(&self, records: &[TradeRecord]) -> anyhow::Result<u64> {
        (**self).insert_trades(records).await
    }
}
