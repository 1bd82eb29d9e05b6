//! Zone Bracket Model

use super::default_true;
use super::pricing::{PricingMode, PricingRule, lenient_mode};
use crate::wire::{LenientDecimal, lenient_option};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Priced cell for one (zone, segment) pair (区域 × 重量段 报价)
///
/// Numeric fields are kept lenient: a backend record with a garbled
/// amount still loads and is flagged rather than read as zero.
/// `price_json` is an explanation blob and never read back as truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: i64,
    pub zone_id: i64,
    pub min_kg: LenientDecimal,
    #[serde(default, deserialize_with = "lenient_option")]
    pub max_kg: Option<LenientDecimal>,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub pricing_mode: Option<PricingMode>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub flat_amount: Option<LenientDecimal>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub base_amount: Option<LenientDecimal>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub rate_per_kg: Option<LenientDecimal>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub base_kg: Option<LenientDecimal>,
    #[serde(default)]
    pub price_json: Option<Value>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Bracket {
    /// Build the record a backend would store for this rule
    pub fn from_rule(
        id: i64,
        zone_id: i64,
        min_kg: Decimal,
        max_kg: Option<Decimal>,
        rule: &PricingRule,
        active: bool,
    ) -> Self {
        let mut bracket = Self {
            id,
            zone_id,
            min_kg: min_kg.into(),
            max_kg: max_kg.map(Into::into),
            pricing_mode: Some(rule.mode()),
            flat_amount: None,
            base_amount: None,
            rate_per_kg: None,
            base_kg: None,
            price_json: None,
            active,
        };
        bracket.apply_rule(rule);
        bracket
    }

    /// Replace the pricing fields with those of `rule`, clearing the rest
    pub fn apply_rule(&mut self, rule: &PricingRule) {
        self.pricing_mode = Some(rule.mode());
        self.flat_amount = None;
        self.base_amount = None;
        self.rate_per_kg = None;
        self.base_kg = None;
        match rule {
            PricingRule::Flat { flat_amount } => {
                self.flat_amount = Some((*flat_amount).into());
            }
            PricingRule::LinearTotal {
                base_amount,
                rate_per_kg,
            } => {
                self.base_amount = Some((*base_amount).into());
                self.rate_per_kg = Some((*rate_per_kg).into());
            }
            PricingRule::StepOver {
                base_kg,
                base_amount,
                rate_per_kg,
            } => {
                self.base_kg = Some((*base_kg).into());
                self.base_amount = Some((*base_amount).into());
                self.rate_per_kg = Some((*rate_per_kg).into());
            }
            PricingRule::ManualQuote => {}
        }
    }
}

/// Create bracket payload (`POST /zones/{zone_id}/brackets`)
///
/// The backend upserts by `(zone_id, min_kg, max_kg)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketCreate {
    #[serde(with = "rust_decimal::serde::float")]
    pub min_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub max_kg: Option<Decimal>,
    #[serde(flatten)]
    pub rule: PricingRule,
    pub active: bool,
}

/// Patch bracket payload (`PATCH /zone-brackets/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketPatch {
    #[serde(flatten)]
    pub rule: PricingRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}
