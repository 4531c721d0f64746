//! Sequential harvest run loop.
//!
//! Drives the planned query sequence one unit at a time: pick a service key,
//! fetch, store, confirm the cursor, pace, repeat. Strictly one request in
//! flight; the pacing delay and the absence of concurrent dispatch are the
//! whole throughput policy.

use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::planner;
use crate::domain::credential::KeyRing;
use crate::domain::date_bucket::DateBucket;
use crate::domain::district::District;
use crate::domain::progress::ProgressStore;
use crate::domain::repositories::TradeWriter;
use crate::domain::services::{FetchOutcome, TradeFetcher};

/// Run-loop tunables.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Row cap per request. Sized to exceed any single district/month count
    /// so no secondary pagination is needed.
    pub page_size: u32,
    /// Pacing delay after every call, success or failure.
    pub request_delay_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            request_delay_ms: 100,
        }
    }
}

/// Final tally of one harvest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Units dispatched (a fetch was issued).
    pub attempted: u64,
    /// Rows acknowledged by the store.
    pub inserted: u64,
    /// Units confirmed empty.
    pub empty_units: u64,
    /// Units that failed transiently and were skipped.
    pub failed_units: u64,
    /// Raw items dropped during normalization across all units.
    pub dropped_items: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// One harvest pass over `districts × buckets`, resuming from the persisted
/// cursor and confirming it after every unit.
pub struct Harvester<F, W, P> {
    fetcher: F,
    writer: W,
    progress: P,
    keys: KeyRing,
    districts: Vec<District>,
    buckets: Vec<DateBucket>,
    config: HarvestConfig,
    session_id: String,
}

impl<F, W, P> Harvester<F, W, P>
where
    F: TradeFetcher,
    W: TradeWriter,
    P: ProgressStore,
{
    pub fn new(
        fetcher: F,
        writer: W,
        progress: P,
        keys: KeyRing,
        districts: Vec<District>,
        buckets: Vec<DateBucket>,
        config: HarvestConfig,
    ) -> Self {
        Self {
            fetcher,
            writer,
            progress,
            keys,
            districts,
            buckets,
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Runs the pass to completion, cancellation, or a fatal store error.
    ///
    /// Per unit: stored and confirmed-empty outcomes confirm the cursor; a
    /// transient failure is logged and the cursor still advances, so one bad
    /// unit never blocks the run (a later full pass is the retry mechanism).
    /// A store-write failure is fatal and does NOT advance the cursor; the
    /// restart re-fetches that unit, keeping inserts at-least-once.
    pub async fn run(&mut self, token: CancellationToken) -> anyhow::Result<HarvestSummary> {
        let started = Instant::now();
        let mut cursor = self.progress.load();
        let bucket_count = self.buckets.len();
        let delay = Duration::from_millis(self.config.request_delay_ms);

        info!(
            session_id = %self.session_id,
            districts = self.districts.len(),
            buckets = bucket_count,
            resume_at = ?cursor,
            "🚀 Starting harvest pass"
        );

        let mut summary = HarvestSummary::default();
        let queries = planner::plan(
            self.districts.clone(),
            self.buckets.clone(),
            cursor,
            self.config.page_size,
        );

        for query in queries {
            if token.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some(slot) = self.acquire_key(&token).await else {
                summary.cancelled = true;
                break;
            };
            let key = self.keys.key(slot).to_string();
            self.keys.record_use(slot, Local::now().date_naive());
            summary.attempted += 1;

            let outcome = tokio::select! {
                outcome = self.fetcher.execute(&query, &key) => outcome,
                _ = token.cancelled() => {
                    warn!(region = %query.region_code, deal_ymd = %query.deal_ymd,
                          "🛑 Fetch cancelled mid-flight; unit left unconfirmed");
                    summary.cancelled = true;
                    break;
                }
            };

            match outcome {
                FetchOutcome::Fetched {
                    records,
                    declared_total,
                    dropped,
                } => {
                    summary.dropped_items += u64::from(dropped);
                    let written =
                        self.writer.insert_trades(&records).await.with_context(|| {
                            format!(
                                "storing {} records for {} {}",
                                records.len(),
                                query.region_code,
                                query.deal_ymd
                            )
                        })?;
                    summary.inserted += written;
                    debug!(
                        region = %query.region_code,
                        deal_ymd = %query.deal_ymd,
                        declared_total,
                        written,
                        dropped,
                        "Unit stored"
                    );
                }
                FetchOutcome::Empty => {
                    summary.empty_units += 1;
                    debug!(region = %query.region_code, deal_ymd = %query.deal_ymd,
                           "No transactions for unit");
                }
                FetchOutcome::Transient(err) => {
                    summary.failed_units += 1;
                    warn!(region = %query.region_code, deal_ymd = %query.deal_ymd,
                          error = %err, "Unit failed; skipping without retry");
                }
            }

            cursor.advance(query.district_index, query.date_index, bucket_count);
            self.progress
                .save(&cursor)
                .context("persisting progress cursor")?;

            tokio::select! {
                _ = sleep(delay) => {}
                _ = token.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            session_id = %self.session_id,
            attempted = summary.attempted,
            inserted = summary.inserted,
            empty_units = summary.empty_units,
            failed_units = summary.failed_units,
            dropped_items = summary.dropped_items,
            cancelled = summary.cancelled,
            elapsed_secs = summary.elapsed.as_secs(),
            key_usage = ?self.keys.used_counts(),
            "🏁 Harvest pass finished"
        );
        Ok(summary)
    }

    /// Picks the next usable key slot, waiting out a full quota exhaustion
    /// until local midnight. Returns `None` only on cancellation.
    async fn acquire_key(&mut self, token: &CancellationToken) -> Option<usize> {
        loop {
            let today = Local::now().date_naive();
            let slot = self.keys.next_key();
            if !self.keys.is_exhausted(slot, today) {
                return Some(slot);
            }
            if !self.keys.all_exhausted(today) {
                continue;
            }
            warn!(
                key_usage = ?self.keys.used_counts(),
                "⏸️ Every service key exhausted; waiting for day rollover"
            );
            tokio::select! {
                _ = wait_until_day_rollover() => {
                    self.keys.reset_all(Local::now().date_naive());
                    info!("🔄 Daily quotas reset; resuming harvest");
                }
                _ = token.cancelled() => {
                    warn!("🛑 Cancelled while waiting out exhausted quotas");
                    return None;
                }
            }
        }
    }
}

/// Sleeps until just past the next local midnight.
async fn wait_until_day_rollover() {
    let now = Local::now();
    let rollover = (now.date_naive() + chrono::Days::new(1)).and_time(chrono::NaiveTime::MIN);
    let wait = (rollover - now.naive_local())
        .to_std()
        .unwrap_or_default()
        // land safely past the boundary
        + Duration::from_secs(1);
    debug!(wait_secs = wait.as_secs(), "Sleeping until local midnight");
    sleep(wait).await;
}
