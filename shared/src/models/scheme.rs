//! Pricing Scheme Model

use super::default_true;
use super::dest_adjustment::DestAdjustment;
use super::pricing::{PricingMode, lenient_mode};
use super::surcharge::Surcharge;
use super::zone::Zone;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weight rounding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round up to the next multiple of `step_kg`
    Ceil,
    #[serde(other)]
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightRounding {
    pub mode: RoundingMode,
    #[serde(with = "rust_decimal::serde::float")]
    pub step_kg: Decimal,
}

/// How billable weight is derived from real weight and dimensions (计费重规则)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableWeightRule {
    /// cm³ per kg; volumetric weight is `L * W * H / divisor`
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub volume_divisor: Option<Decimal>,
    #[serde(default)]
    pub rounding: Option<WeightRounding>,
}

/// Pricing scheme with everything needed to price an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSchemeDetail {
    pub id: i64,
    #[serde(default)]
    pub shipping_provider_id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub archived_at: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub default_pricing_mode: Option<PricingMode>,
    #[serde(default)]
    pub billable_weight_rule: Option<BillableWeightRule>,
    #[serde(default)]
    pub default_segment_template_id: Option<i64>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub surcharges: Vec<Surcharge>,
    #[serde(default)]
    pub dest_adjustments: Vec<DestAdjustment>,
}

fn default_currency() -> String {
    "CNY".to_string()
}

impl PricingSchemeDetail {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Mode used when a cell has no draft or an unreadable mode
    pub fn fallback_mode(&self) -> PricingMode {
        self.default_pricing_mode.unwrap_or(PricingMode::LinearTotal)
    }

    pub fn zone(&self, zone_id: i64) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_defaults() {
        let s: PricingSchemeDetail = serde_json::from_str(
            r#"{"id": 1, "name": "express", "default_pricing_mode": "weird"}"#,
        )
        .unwrap();
        assert_eq!(s.currency, "CNY");
        assert!(s.active);
        assert_eq!(s.default_pricing_mode, None);
        assert_eq!(s.fallback_mode(), PricingMode::LinearTotal);
        assert!(s.zones.is_empty());
    }

    #[test]
    fn test_billable_weight_rule() {
        let r: BillableWeightRule = serde_json::from_str(
            r#"{"volume_divisor": 6000, "rounding": {"mode": "ceil", "step_kg": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(r.volume_divisor, Some(Decimal::new(6000, 0)));
        let rounding = r.rounding.unwrap();
        assert_eq!(rounding.mode, RoundingMode::Ceil);
        assert_eq!(rounding.step_kg, Decimal::new(5, 1));
    }
}
