//! Administrative-district reference data.
//!
//! The reference table is loaded once at startup and never mutated during a
//! run; normalization joins every incoming item against it by region code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the district reference table. `region_code` is the 5-digit
/// administrative code the upstream API keys transactions by (`LAWD_CD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub region_code: String,
    /// Display name of the si/gun/gu, e.g. "종로구".
    pub sigungu_name: String,
    /// Top-level address fragment (si/do), e.g. "서울특별시".
    pub addr_level1: String,
    /// Second-level address fragment, e.g. "종로구" or "수원시 장안구".
    pub addr_level2: String,
}

impl District {
    /// Leading fragment used when composing a record's full address.
    #[must_use]
    pub fn address_prefix(&self) -> String {
        format!("{} {}", self.addr_level1, self.addr_level2)
    }
}

/// Read-only region-code lookup over the reference table.
#[derive(Debug, Default)]
pub struct DistrictDirectory {
    by_code: HashMap<String, District>,
}

impl DistrictDirectory {
    #[must_use]
    pub fn new(districts: Vec<District>) -> Self {
        let by_code = districts
            .into_iter()
            .map(|d| (d.region_code.clone(), d))
            .collect();
        Self { by_code }
    }

    #[must_use]
    pub fn lookup(&self, region_code: &str) -> Option<&District> {
        self.by_code.get(region_code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
