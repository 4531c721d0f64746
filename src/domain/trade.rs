//! Transaction records and the normalization rules that produce them.
//!
//! A [`RawTradeItem`] is the wire shape: every field optional, padded,
//! untrusted. [`TradeRecord::normalize`] either turns one into a storable
//! row or reports exactly why it cannot; callers drop the item with a
//! warning and keep the rest of the batch.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::district::DistrictDirectory;

/// Square meters per pyeong.
const SQM_PER_PYEONG: f64 = 3.3;

static PAREN_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("annotation pattern compiles"));

/// One trade item exactly as it appears in the response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTradeItem {
    #[serde(rename = "dealYear", default)]
    pub deal_year: Option<String>,
    #[serde(rename = "dealMonth", default)]
    pub deal_month: Option<String>,
    #[serde(rename = "dealDay", default)]
    pub deal_day: Option<String>,
    /// Deal amount in 10,000 KRW, with thousands separators (" 82,500").
    #[serde(rename = "dealAmount", default)]
    pub deal_amount: Option<String>,
    /// Exclusive-use area in m², fractional ("84.97").
    #[serde(rename = "excluUseAr", default)]
    pub area: Option<String>,
    #[serde(rename = "sggCd", default)]
    pub region_code: Option<String>,
    /// Legal-dong name, e.g. "사직동".
    #[serde(rename = "umdNm", default)]
    pub dong_name: Option<String>,
    /// Lot number within the dong.
    #[serde(rename = "jibun", default)]
    pub jibun: Option<String>,
    #[serde(rename = "buildYear", default)]
    pub build_year: Option<String>,
    #[serde(rename = "aptNm", default)]
    pub apt_name: Option<String>,
    /// Building section within the complex; frequently blank upstream.
    #[serde(rename = "aptDong", default)]
    pub apt_section: Option<String>,
    /// Floor; basements arrive sign-encoded.
    #[serde(rename = "floor", default)]
    pub floor: Option<String>,
}

/// A normalized transaction row, ready for the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub region_code: String,
    pub contract_date: NaiveDate,
    pub district_name: String,
    /// Denormalized copy of the region code, kept column-for-column with the
    /// legacy trade table so reports can group without a join.
    pub district_code: String,
    pub construction_year: i32,
    /// Composed: si/do + si/gun/gu + legal dong + lot number.
    pub address: String,
    pub apt_name: String,
    pub apt_section: Option<String>,
    pub floor: u32,
    /// Rounded to the nearest whole m².
    pub area: i64,
    /// In 10,000 KRW.
    pub price: i64,
    /// Price in 100M KRW (price / 10,000).
    pub price_unit: f64,
    /// Price per pyeong, rounded, in 10,000 KRW.
    pub py: i64,
    /// Price per pyeong in 100M KRW.
    pub py_unit: f64,
}

/// Why a single raw item was dropped. Item drops are warnings, never fatal
/// to the batch that carried them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),
    #[error("field `{field}` does not parse as a number: `{value}`")]
    Numeric { field: &'static str, value: String },
    #[error("contract date {year}-{month:02}-{day:02} is not a valid calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("area `{0}` rounds to nothing; price per pyeong would be undefined")]
    DegenerateArea(String),
    #[error("region code `{0}` is not in the district reference table")]
    UnknownRegion(String),
}

impl TradeRecord {
    /// Builds a normalized record from one wire item, or says why it cannot.
    pub fn normalize(
        raw: &RawTradeItem,
        districts: &DistrictDirectory,
    ) -> Result<Self, ItemError> {
        let year = required(&raw.deal_year, "dealYear")?;
        let month = required(&raw.deal_month, "dealMonth")?;
        let day = required(&raw.deal_day, "dealDay")?;
        let amount = required(&raw.deal_amount, "dealAmount")?;
        let area_raw = required(&raw.area, "excluUseAr")?;
        let region_code = required(&raw.region_code, "sggCd")?;
        let dong_name = required(&raw.dong_name, "umdNm")?;
        let jibun = required(&raw.jibun, "jibun")?;
        let build_year = required(&raw.build_year, "buildYear")?;
        let apt_name_raw = required(&raw.apt_name, "aptNm")?;
        let floor_raw = required(&raw.floor, "floor")?;

        let district = districts
            .lookup(region_code)
            .ok_or_else(|| ItemError::UnknownRegion(region_code.to_string()))?;

        let year: i32 = parse_num(year, "dealYear")?;
        let month: u32 = parse_num(month, "dealMonth")?;
        let day: u32 = parse_num(day, "dealDay")?;
        let contract_date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ItemError::InvalidDate { year, month, day })?;

        let price = parse_amount(amount)?;
        let area = parse_area(area_raw)?;
        if area <= 0 {
            return Err(ItemError::DegenerateArea(area_raw.to_string()));
        }
        let floor = parse_floor(floor_raw)?;
        let construction_year: i32 = parse_num(build_year, "buildYear")?;

        let py = (price as f64 / area as f64 * SQM_PER_PYEONG).round() as i64;

        Ok(Self {
            region_code: region_code.to_string(),
            contract_date,
            district_name: district.sigungu_name.clone(),
            district_code: region_code.to_string(),
            construction_year,
            address: format!("{} {} {}", district.address_prefix(), dong_name, jibun),
            apt_name: strip_annotations(apt_name_raw),
            apt_section: raw
                .apt_section
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            floor,
            area,
            price,
            price_unit: price as f64 / 10_000.0,
            py,
            py_unit: py as f64 / 10_000.0,
        })
    }
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, ItemError> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ItemError::MissingField(name)),
    }
}

fn parse_num<T: FromStr>(value: &str, field: &'static str) -> Result<T, ItemError> {
    value.parse().map_err(|_| ItemError::Numeric {
        field,
        value: value.to_string(),
    })
}

/// Deal amounts carry thousands separators and stray padding.
fn parse_amount(value: &str) -> Result<i64, ItemError> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse().map_err(|_| ItemError::Numeric {
        field: "dealAmount",
        value: value.to_string(),
    })
}

/// Area is fractional m² on the wire, whole m² in the store.
fn parse_area(value: &str) -> Result<i64, ItemError> {
    let sqm: f64 = parse_num(value, "excluUseAr")?;
    Ok(sqm.round() as i64)
}

/// Basement floors arrive sign-encoded; display wants magnitude only.
fn parse_floor(value: &str) -> Result<u32, ItemError> {
    let floor: i32 = parse_num(value, "floor")?;
    Ok(floor.unsigned_abs())
}

/// Removes complex annotations like "(101동~105동)" from apartment names.
fn strip_annotations(value: &str) -> String {
    PAREN_ANNOTATION.replace_all(value, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::district::District;
    use rstest::rstest;

    fn directory() -> DistrictDirectory {
        DistrictDirectory::new(vec![District {
            region_code: "11110".to_string(),
            sigungu_name: "종로구".to_string(),
            addr_level1: "서울특별시".to_string(),
            addr_level2: "종로구".to_string(),
        }])
    }

    fn complete_item() -> RawTradeItem {
        RawTradeItem {
            deal_year: Some("2023".to_string()),
            deal_month: Some("7".to_string()),
            deal_day: Some("14".to_string()),
            deal_amount: Some(" 82,500".to_string()),
            area: Some("94.51".to_string()),
            region_code: Some("11110".to_string()),
            dong_name: Some(" 사직동".to_string()),
            jibun: Some("9".to_string()),
            build_year: Some("2008".to_string()),
            apt_name: Some("광화문풍림스페이스본(101동~105동)".to_string()),
            apt_section: Some("103동".to_string()),
            floor: Some("11".to_string()),
        }
    }

    #[test]
    fn normalizes_a_complete_item() {
        let record = TradeRecord::normalize(&complete_item(), &directory()).unwrap();
        assert_eq!(record.region_code, "11110");
        assert_eq!(record.contract_date, NaiveDate::from_ymd_opt(2023, 7, 14).unwrap());
        assert_eq!(record.district_name, "종로구");
        assert_eq!(record.address, "서울특별시 종로구 사직동 9");
        assert_eq!(record.apt_name, "광화문풍림스페이스본");
        assert_eq!(record.apt_section.as_deref(), Some("103동"));
        assert_eq!(record.price, 82_500);
        assert_eq!(record.area, 95);
        assert_eq!(record.floor, 11);
        assert!((record.price_unit - 8.25).abs() < f64::EPSILON);
        // 82500 / 95 * 3.3 = 2865.789... -> 2866
        assert_eq!(record.py, 2866);
    }

    #[rstest]
    #[case("-3", 3)]
    #[case("3", 3)]
    #[case("0", 0)]
    fn floor_takes_absolute_value(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(parse_floor(input).unwrap(), expected);
    }

    #[rstest]
    #[case("123,456", 123_456)]
    #[case(" 82,500 ", 82_500)]
    #[case("9000", 9_000)]
    fn amount_strips_separators(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_amount(input).unwrap(), expected);
    }

    #[rstest]
    #[case("84.97", 85)]
    #[case("84.49", 84)]
    #[case("100", 100)]
    fn area_rounds_to_whole_sqm(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_area(input).unwrap(), expected);
    }

    #[rstest]
    #[case("Sample Tower(101-dong)", "Sample Tower")]
    #[case("래미안(1차)(2단지)", "래미안")]
    #[case("한강맨션", "한강맨션")]
    fn apartment_name_drops_parenthesized_suffix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_annotations(input), expected);
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let mut item = complete_item();
        item.deal_amount = Some("   ".to_string());
        assert_eq!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::MissingField("dealAmount"))
        );
        item.deal_amount = None;
        assert_eq!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::MissingField("dealAmount"))
        );
    }

    #[test]
    fn unknown_region_code_is_rejected() {
        let mut item = complete_item();
        item.region_code = Some("99999".to_string());
        assert_eq!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::UnknownRegion("99999".to_string()))
        );
    }

    #[test]
    fn impossible_calendar_date_is_rejected() {
        let mut item = complete_item();
        item.deal_month = Some("2".to_string());
        item.deal_day = Some("30".to_string());
        assert!(matches!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::InvalidDate { .. })
        ));
    }

    #[test]
    fn tiny_area_is_degenerate() {
        let mut item = complete_item();
        item.area = Some("0.3".to_string());
        assert_eq!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::DegenerateArea("0.3".to_string()))
        );
    }

    #[test]
    fn blank_section_becomes_none() {
        let mut item = complete_item();
        item.apt_section = Some("  ".to_string());
        let record = TradeRecord::normalize(&item, &directory()).unwrap();
        assert_eq!(record.apt_section, None);
    }

    #[test]
    fn ranged_deal_day_is_a_numeric_error() {
        // Older API vintages encoded day spans like "1~10".
        let mut item = complete_item();
        item.deal_day = Some("1~10".to_string());
        assert_eq!(
            TradeRecord::normalize(&item, &directory()),
            Err(ItemError::Numeric {
                field: "dealDay",
                value: "1~10".to_string()
            })
        );
    }
}
