//! Destination Adjustment Model

use super::default_true;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scope of a destination adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentScope {
    Province,
    City,
}

/// Flat amount added when the destination matches (目的地调整)
///
/// Province scope and city scope are mutually exclusive for the same
/// province while both are active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestAdjustment {
    pub id: i64,
    pub scheme_id: i64,
    pub scope: AdjustmentScope,
    pub province_code: String,
    #[serde(default)]
    pub city_code: Option<String>,
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
}

impl DestAdjustment {
    /// Display label, e.g. `浙江省` or `浙江省/杭州市`
    pub fn label(&self) -> String {
        let province = self.province_name.as_deref().unwrap_or(&self.province_code);
        match self.scope {
            AdjustmentScope::Province => province.to_string(),
            AdjustmentScope::City => {
                let city = self
                    .city_name
                    .as_deref()
                    .or(self.city_code.as_deref())
                    .unwrap_or("?");
                format!("{province}/{city}")
            }
        }
    }

    /// Whether the adjustment covers the given province
    pub fn matches_province(&self, province: &str) -> bool {
        self.province_code == province || self.province_name.as_deref() == Some(province)
    }

    /// Whether the adjustment covers the given city
    pub fn matches_city(&self, city: &str) -> bool {
        self.city_code.as_deref() == Some(city) || self.city_name.as_deref() == Some(city)
    }
}

/// Upsert payload (`POST /pricing-schemes/{id}/dest-adjustments:upsert`)
///
/// The backend matches an existing row by `(scope, province_code, city_code)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestAdjustmentUpsert {
    pub scope: AdjustmentScope,
    pub province_code: String,
    #[serde(default)]
    pub city_code: Option<String>,
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Patch payload (`PATCH /dest-adjustments/{id}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestAdjustmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}
