//! Fetch-and-parse pipeline against the trade endpoint.
//!
//! One call in, one [`FetchOutcome`] out. The empty-versus-error ambiguity
//! lives here: the upstream answers malformed requests and genuinely empty
//! months with the same envelope shape, and the declared-count check is the
//! only available disambiguator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::district::DistrictDirectory;
use crate::domain::query::TradeQuery;
use crate::domain::services::{FetchOutcome, TradeFetcher, TransientError};
use crate::domain::trade::TradeRecord;
use crate::infrastructure::config::molit;
use crate::infrastructure::envelope::parse_envelope;
use crate::infrastructure::http::ApiClient;

/// [`TradeFetcher`] backed by the MOLIT open API.
pub struct MolitTradeFetcher {
    client: ApiClient,
    districts: Arc<DistrictDirectory>,
}

impl MolitTradeFetcher {
    pub fn new(client: ApiClient, districts: Arc<DistrictDirectory>) -> Self {
        Self { client, districts }
    }

    /// Classifies one raw response body for one query.
    fn outcome_from_xml(&self, query: &TradeQuery, xml: &str) -> FetchOutcome {
        let envelope = match parse_envelope(xml) {
            Ok(envelope) => envelope,
            Err(err) => {
                return FetchOutcome::Transient(TransientError::Envelope(err.to_string()));
            }
        };

        if envelope.header.result_code != molit::RESULT_OK {
            return FetchOutcome::Transient(TransientError::ResultCode {
                code: envelope.header.result_code,
                msg: envelope.header.result_msg,
            });
        }

        let declared_total = envelope.declared_total();
        let items = envelope.items();
        if items.is_empty() {
            return FetchOutcome::Empty;
        }
        if declared_total as usize != items.len() {
            warn!(
                region = %query.region_code,
                deal_ymd = %query.deal_ymd,
                declared_total,
                extracted = items.len(),
                "Declared count disagrees with item list; treating unit as empty"
            );
            return FetchOutcome::Empty;
        }

        let mut records = Vec::with_capacity(items.len());
        let mut dropped = 0u32;
        for item in items {
            match TradeRecord::normalize(item, &self.districts) {
                Ok(record) => records.push(record),
                Err(err) => {
                    dropped += 1;
                    warn!(
                        region = %query.region_code,
                        deal_ymd = %query.deal_ymd,
                        error = %err,
                        "Dropping unusable item"
                    );
                }
            }
        }

        FetchOutcome::Fetched {
            records,
            declared_total,
            dropped,
        }
    }
}

#[async_trait]
impl TradeFetcher for MolitTradeFetcher {
    async fn execute(&self, query: &TradeQuery, service_key: &str) -> FetchOutcome {
        let xml = match self.client.get_trades(query, service_key).await {
            Ok(xml) => xml,
            Err(err) => return FetchOutcome::Transient(err),
        };
        self.outcome_from_xml(query, &xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::district::District;
    use crate::infrastructure::http::ApiClientConfig;

    fn fetcher() -> MolitTradeFetcher {
        let directory = DistrictDirectory::new(vec![District {
            region_code: "11110".to_string(),
            sigungu_name: "종로구".to_string(),
            addr_level1: "서울특별시".to_string(),
            addr_level2: "종로구".to_string(),
        }]);
        // Client construction is offline; no request is issued here.
        let client = ApiClient::new(ApiClientConfig::default()).unwrap();
        MolitTradeFetcher::new(client, Arc::new(directory))
    }

    fn query() -> TradeQuery {
        TradeQuery {
            district_index: 0,
            date_index: 0,
            region_code: "11110".to_string(),
            deal_ymd: "202307".to_string(),
            num_rows: 10_000,
        }
    }

    fn response(total: u32, items: &str) -> String {
        format!(
            r#"<response>
  <header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg></header>
  <body><items>{items}</items><totalCount>{total}</totalCount></body>
</response>"#
        )
    }

    const VALID_ITEM: &str = "<item>\
        <aptNm>광화문풍림스페이스본</aptNm><buildYear>2008</buildYear>\
        <dealAmount>82,500</dealAmount><dealDay>14</dealDay><dealMonth>7</dealMonth>\
        <dealYear>2023</dealYear><excluUseAr>94.51</excluUseAr><floor>11</floor>\
        <jibun>9</jibun><sggCd>11110</sggCd><umdNm>사직동</umdNm></item>";

    // Same shape, missing dealAmount.
    const BROKEN_ITEM: &str = "<item>\
        <aptNm>경희궁의아침</aptNm><buildYear>2004</buildYear>\
        <dealDay>2</dealDay><dealMonth>7</dealMonth>\
        <dealYear>2023</dealYear><excluUseAr>124.17</excluUseAr><floor>3</floor>\
        <jibun>71</jibun><sggCd>11110</sggCd><umdNm>내수동</umdNm></item>";

    #[test]
    fn matching_count_yields_normalized_records() {
        let outcome = fetcher().outcome_from_xml(&query(), &response(1, VALID_ITEM));
        match outcome {
            FetchOutcome::Fetched {
                records,
                declared_total,
                dropped,
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(declared_total, 1);
                assert_eq!(dropped, 0);
                assert_eq!(records[0].price, 82_500);
            }
            other => panic!("expected Fetched, got {other:?}"),
        }
    }

    #[test]
    fn broken_sibling_is_dropped_but_batch_survives() {
        let items = format!("{VALID_ITEM}{BROKEN_ITEM}");
        let outcome = fetcher().outcome_from_xml(&query(), &response(2, &items));
        match outcome {
            FetchOutcome::Fetched {
                records, dropped, ..
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(dropped, 1);
                assert_eq!(records[0].apt_name, "광화문풍림스페이스본");
            }
            other => panic!("expected Fetched, got {other:?}"),
        }
    }

    #[test]
    fn count_mismatch_is_confirmed_empty() {
        // Upstream claims five rows but delivered one.
        let outcome = fetcher().outcome_from_xml(&query(), &response(5, VALID_ITEM));
        assert!(matches!(outcome, FetchOutcome::Empty));
    }

    #[test]
    fn empty_item_list_is_confirmed_empty() {
        let outcome = fetcher().outcome_from_xml(&query(), &response(0, ""));
        assert!(matches!(outcome, FetchOutcome::Empty));
    }

    #[test]
    fn non_ok_result_code_is_transient() {
        let xml = r#"<response>
  <header><resultCode>22</resultCode><resultMsg>LIMITED NUMBER OF SERVICE REQUESTS EXCEEDS ERROR.</resultMsg></header>
</response>"#;
        let outcome = fetcher().outcome_from_xml(&query(), xml);
        match outcome {
            FetchOutcome::Transient(TransientError::ResultCode { code, msg }) => {
                assert_eq!(code, "22");
                assert!(msg.contains("EXCEEDS"));
            }
            other => panic!("expected ResultCode, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_document_is_transient() {
        let outcome = fetcher().outcome_from_xml(&query(), "<not-even-close");
        assert!(matches!(
            outcome,
            FetchOutcome::Transient(TransientError::Envelope(_))
        ));
    }
}
