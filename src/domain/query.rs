use crate::domain::date_bucket::DateBucket;
use crate::domain::district::District;

/// One fully-bound fetch unit: a district crossed with a month, plus the
/// indices the cursor needs to confirm it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeQuery {
    pub district_index: usize,
    pub date_index: usize,
    /// Five-digit LAWD_CD sent to the API.
    pub region_code: String,
    /// `YYYYMM` deal month.
    pub deal_ymd: String,
    /// Page size. Sized to swallow a whole month so one request covers
    /// the unit.
    pub num_rows: u32,
}

impl TradeQuery {
    #[must_use]
    pub fn new(
        district_index: usize,
        date_index: usize,
        district: &District,
        bucket: DateBucket,
        num_rows: u32,
    ) -> Self {
        Self {
            district_index,
            date_index,
            region_code: district.region_code.clone(),
            deal_ymd: bucket.token(),
            num_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_district_and_bucket() {
        let district = District {
            region_code: "11110".into(),
            sigungu_name: "종로구".into(),
            addr_level1: "서울특별시".into(),
            addr_level2: "종로구".into(),
        };
        let query = TradeQuery::new(4, 7, &district, DateBucket::new(2023, 8), 10_000);
        assert_eq!(query.region_code, "11110");
        assert_eq!(query.deal_ymd, "202308");
        assert_eq!((query.district_index, query.date_index), (4, 7));
    }
}
