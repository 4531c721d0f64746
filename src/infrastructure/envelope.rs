//! Wire-format types for the trade API's XML response envelope.
//!
//! The upstream wraps every answer in `<response><header/><body/></response>`;
//! error answers (bad key, malformed request) use a different document shape
//! entirely, which surfaces here as a deserialization failure and is treated
//! as transient by the caller. The declared total count has moved between
//! header and body across API vintages, so both slots are read.

use serde::Deserialize;

use crate::domain::trade::RawTradeItem;

#[derive(Debug, Deserialize)]
#[serde(rename = "response")]
pub struct ResponseEnvelope {
    pub header: ResponseHeader,
    #[serde(default)]
    pub body: ResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    #[serde(rename = "resultCode")]
    pub result_code: String,
    #[serde(rename = "resultMsg", default)]
    pub result_msg: String,
    #[serde(rename = "totalCount", default)]
    pub total_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub items: Items,
    #[serde(rename = "numOfRows", default)]
    pub num_of_rows: Option<u32>,
    #[serde(rename = "pageNo", default)]
    pub page_no: Option<u32>,
    #[serde(rename = "totalCount", default)]
    pub total_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Items {
    #[serde(rename = "item", default)]
    pub item: Vec<RawTradeItem>,
}

impl ResponseEnvelope {
    /// Item count the upstream claims for this query, wherever it put it.
    #[must_use]
    pub fn declared_total(&self) -> u32 {
        self.header
            .total_count
            .or(self.body.total_count)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn items(&self) -> &[RawTradeItem] {
        &self.body.items.item
    }
}

/// Parses a raw response body into the envelope.
pub fn parse_envelope(xml: &str) -> Result<ResponseEnvelope, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ITEM_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <header>
    <resultCode>00</resultCode>
    <resultMsg>NORMAL SERVICE.</resultMsg>
  </header>
  <body>
    <items>
      <item>
        <aptNm>광화문풍림스페이스본</aptNm>
        <buildYear>2008</buildYear>
        <dealAmount> 82,500</dealAmount>
        <dealDay>14</dealDay>
        <dealMonth>7</dealMonth>
        <dealYear>2023</dealYear>
        <excluUseAr>94.51</excluUseAr>
        <floor>11</floor>
        <jibun>9</jibun>
        <sggCd>11110</sggCd>
        <umdNm>사직동</umdNm>
      </item>
      <item>
        <aptNm>경희궁의아침</aptNm>
        <aptDong>3단지</aptDong>
        <buildYear>2004</buildYear>
        <dealAmount>150,000</dealAmount>
        <dealDay>2</dealDay>
        <dealMonth>7</dealMonth>
        <dealYear>2023</dealYear>
        <excluUseAr>124.17</excluUseAr>
        <floor>-1</floor>
        <jibun>71</jibun>
        <sggCd>11110</sggCd>
        <umdNm>내수동</umdNm>
      </item>
    </items>
    <numOfRows>10000</numOfRows>
    <pageNo>1</pageNo>
    <totalCount>2</totalCount>
  </body>
</response>"#;

    const EMPTY_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <header>
    <resultCode>00</resultCode>
    <resultMsg>NORMAL SERVICE.</resultMsg>
  </header>
  <body>
    <items/>
    <numOfRows>10000</numOfRows>
    <pageNo>1</pageNo>
    <totalCount>0</totalCount>
  </body>
</response>"#;

    const ERROR_RESPONSE: &str = r#"<response>
  <header>
    <resultCode>22</resultCode>
    <resultMsg>LIMITED NUMBER OF SERVICE REQUESTS EXCEEDS ERROR.</resultMsg>
  </header>
</response>"#;

    #[test]
    fn parses_items_and_total_count() {
        let envelope = parse_envelope(TWO_ITEM_RESPONSE).unwrap();
        assert_eq!(envelope.header.result_code, "00");
        assert_eq!(envelope.declared_total(), 2);

        let items = envelope.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].apt_name.as_deref(), Some("광화문풍림스페이스본"));
        assert_eq!(items[0].deal_amount.as_deref(), Some(" 82,500"));
        assert_eq!(items[0].apt_section, None);
        assert_eq!(items[1].apt_section.as_deref(), Some("3단지"));
        assert_eq!(items[1].floor.as_deref(), Some("-1"));
    }

    #[test]
    fn empty_items_element_yields_no_items() {
        let envelope = parse_envelope(EMPTY_RESPONSE).unwrap();
        assert_eq!(envelope.declared_total(), 0);
        assert!(envelope.items().is_empty());
    }

    #[test]
    fn quota_error_envelope_still_parses() {
        let envelope = parse_envelope(ERROR_RESPONSE).unwrap();
        assert_eq!(envelope.header.result_code, "22");
        assert!(envelope.items().is_empty());
        assert_eq!(envelope.declared_total(), 0);
    }

    #[test]
    fn foreign_document_shape_is_an_error() {
        let xml = "<OpenAPI_ServiceResponse><cmmMsgHeader/></OpenAPI_ServiceResponse>";
        assert!(parse_envelope(xml).is_err());
    }
}
