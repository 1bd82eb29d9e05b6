//! Cell price calculator
//!
//! Decimal arithmetic throughout, rounded once at the end.

use rust_decimal::prelude::*;
use shared::models::PricingRule;

/// Money rounding: 2 decimal places, half away from zero
pub const DECIMAL_PLACES: u32 = 2;

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Result of pricing one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPrice {
    Computed(Decimal),
    /// Needs a human quote; never read as zero
    ManualQuote,
    /// Weight or amounts too large for decimal arithmetic
    OutOfRange,
}

impl CellPrice {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            CellPrice::Computed(v) => Some(*v),
            CellPrice::ManualQuote | CellPrice::OutOfRange => None,
        }
    }
}

/// Price of `weight` billable kilograms under `rule`
pub fn compute_price(rule: &PricingRule, weight: Decimal) -> CellPrice {
    let raw = match rule {
        PricingRule::Flat { flat_amount } => Some(*flat_amount),
        PricingRule::LinearTotal {
            base_amount,
            rate_per_kg,
        } => rate_per_kg
            .checked_mul(weight)
            .and_then(|v| base_amount.checked_add(v)),
        PricingRule::StepOver {
            base_kg,
            base_amount,
            rate_per_kg,
        } => {
            if weight <= *base_kg {
                Some(*base_amount)
            } else {
                weight
                    .checked_sub(*base_kg)
                    .and_then(|over| rate_per_kg.checked_mul(over))
                    .and_then(|v| base_amount.checked_add(v))
            }
        }
        PricingRule::ManualQuote => return CellPrice::ManualQuote,
    };
    match raw {
        Some(v) => CellPrice::Computed(round_money(v)),
        None => CellPrice::OutOfRange,
    }
}
