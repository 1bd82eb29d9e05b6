//! Pricing Mode Model

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pricing mode of a bracket (区间计价方式)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Fixed price for the whole segment
    Flat,
    /// `base_amount + rate_per_kg * weight`
    LinearTotal,
    /// `base_amount` up to `base_kg`, then `rate_per_kg` per kg over
    StepOver,
    /// Placeholder that needs a human quote
    ManualQuote,
}

impl PricingMode {
    pub const ALL: [PricingMode; 4] = [
        PricingMode::Flat,
        PricingMode::LinearTotal,
        PricingMode::StepOver,
        PricingMode::ManualQuote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Flat => "flat",
            PricingMode::LinearTotal => "linear_total",
            PricingMode::StepOver => "step_over",
            PricingMode::ManualQuote => "manual_quote",
        }
    }

    /// Case-insensitive parse; unknown modes yield `None`
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| format!("unknown pricing mode: {s}"))
    }
}

/// Deserialize an optional pricing mode, mapping unknown strings to `None`
pub fn lenient_mode<'de, D>(deserializer: D) -> Result<Option<PricingMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(PricingMode::parse_lenient))
}

/// A fully validated pricing rule, the write payload for one cell
///
/// Serializes with `pricing_mode` as the tag and only the fields that
/// mode reads, e.g. `{"pricing_mode":"flat","flat_amount":8.0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pricing_mode", rename_all = "snake_case")]
pub enum PricingRule {
    Flat {
        #[serde(with = "rust_decimal::serde::float")]
        flat_amount: Decimal,
    },
    LinearTotal {
        #[serde(with = "rust_decimal::serde::float")]
        base_amount: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        rate_per_kg: Decimal,
    },
    StepOver {
        #[serde(with = "rust_decimal::serde::float")]
        base_kg: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        base_amount: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        rate_per_kg: Decimal,
    },
    ManualQuote,
}

impl PricingRule {
    pub fn mode(&self) -> PricingMode {
        match self {
            PricingRule::Flat { .. } => PricingMode::Flat,
            PricingRule::LinearTotal { .. } => PricingMode::LinearTotal,
            PricingRule::StepOver { .. } => PricingMode::StepOver,
            PricingRule::ManualQuote => PricingMode::ManualQuote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(PricingMode::parse_lenient(" FLAT "), Some(PricingMode::Flat));
        assert_eq!(
            PricingMode::parse_lenient("step_over"),
            Some(PricingMode::StepOver)
        );
        assert_eq!(PricingMode::parse_lenient("table"), None);
    }

    #[test]
    fn test_rule_emits_only_mode_fields() {
        let rule = PricingRule::Flat {
            flat_amount: Decimal::new(800, 2),
        };
        let v = serde_json::to_value(&rule).unwrap();
        assert_eq!(v["pricing_mode"], "flat");
        assert_eq!(v["flat_amount"], 8.0);
        assert_eq!(v.as_object().unwrap().len(), 2);

        let manual = serde_json::to_value(PricingRule::ManualQuote).unwrap();
        assert_eq!(manual, serde_json::json!({"pricing_mode": "manual_quote"}));
    }

    #[test]
    fn test_step_over_payload_fields() {
        let rule = PricingRule::StepOver {
            base_kg: Decimal::ONE,
            base_amount: Decimal::new(5, 0),
            rate_per_kg: Decimal::new(2, 0),
        };
        let v = serde_json::to_value(&rule).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(obj.contains_key("base_kg"));
        assert!(!obj.contains_key("flat_amount"));
    }
}
