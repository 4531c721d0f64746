//! Lazy enumeration of the harvest space.
//!
//! The full plan is `districts × buckets` in lexicographic order; for a
//! nationwide run that is hundreds of thousands of units, so it is produced
//! as an iterator rather than a materialized list. Resume is a matter of
//! starting the enumeration at the cursor instead of replaying and skipping.

use crate::domain::date_bucket::DateBucket;
use crate::domain::district::District;
use crate::domain::progress::ProgressCursor;
use crate::domain::query::TradeQuery;

/// Plans every unit at or after `cursor`, outermost by district, innermost by
/// month. The first (resumed) district starts at the cursor's date index;
/// every later district starts from its first bucket.
pub fn plan(
    districts: Vec<District>,
    buckets: Vec<DateBucket>,
    cursor: ProgressCursor,
    num_rows: u32,
) -> impl Iterator<Item = TradeQuery> {
    let bucket_count = buckets.len();
    districts
        .into_iter()
        .enumerate()
        .skip(cursor.district_index)
        .flat_map(move |(district_index, district)| {
            let first_bucket = if district_index == cursor.district_index {
                cursor.date_index
            } else {
                0
            };
            let buckets = buckets.clone();
            (first_bucket..bucket_count).map(move |date_index| {
                TradeQuery::new(
                    district_index,
                    date_index,
                    &district,
                    buckets[date_index],
                    num_rows,
                )
            })
        })
}
