//! Surcharge Model

use super::default_true;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Destination part of a surcharge condition; empty lists match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub province: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub city: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub district: Vec<String>,
}

/// When a surcharge applies (`condition_json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<DestCondition>,
    /// Applies when the order carries any of these flags (e.g. `bulky`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flag_any: Vec<String>,
}

/// How much a surcharge adds (`amount_json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurchargeAmount {
    Flat {
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
    },
    PerKg {
        #[serde(with = "rust_decimal::serde::float")]
        rate_per_kg: Decimal,
    },
    /// A kind this client cannot evaluate (e.g. weight tables)
    #[serde(other)]
    Unsupported,
}

/// Rule surcharge attached to a scheme (附加费)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surcharge {
    pub id: i64,
    pub scheme_id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub condition_json: SurchargeCondition,
    pub amount_json: SurchargeAmount,
}

/// Create surcharge payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurchargeCreate {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
    pub condition_json: SurchargeCondition,
    pub amount_json: SurchargeAmount,
}

impl SurchargeCreate {
    /// Flat fee charged on orders flagged `bulky`
    pub fn bulky_fee(amount: Decimal) -> Self {
        Self {
            name: "bulky".to_string(),
            active: true,
            priority: 100,
            condition_json: SurchargeCondition {
                dest: None,
                flag_any: vec!["bulky".to_string()],
            },
            amount_json: SurchargeAmount::Flat { amount },
        }
    }
}

/// Update surcharge payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurchargeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_json: Option<SurchargeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_json: Option<SurchargeAmount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulky_fee_wire_shape() {
        let v = serde_json::to_value(SurchargeCreate::bulky_fee(Decimal::new(10, 0))).unwrap();
        assert_eq!(v["condition_json"], serde_json::json!({"flag_any": ["bulky"]}));
        assert_eq!(v["amount_json"]["kind"], "flat");
        assert_eq!(v["amount_json"]["amount"], 10.0);
    }

    #[test]
    fn test_unknown_amount_kind() {
        let s: Surcharge = serde_json::from_str(
            r#"{"id": 1, "scheme_id": 1, "name": "t", "amount_json": {"kind": "table"}}"#,
        )
        .unwrap();
        assert_eq!(s.amount_json, SurchargeAmount::Unsupported);
        assert!(s.condition_json.dest.is_none());
    }

    #[test]
    fn test_dest_condition() {
        let s: Surcharge = serde_json::from_str(
            r#"{"id": 1, "scheme_id": 1, "name": "remote",
                "condition_json": {"dest": {"province": ["新疆"]}},
                "amount_json": {"kind": "per_kg", "rate_per_kg": 2}}"#,
        )
        .unwrap();
        assert_eq!(s.condition_json.dest.unwrap().province, vec!["新疆"]);
        assert_eq!(
            s.amount_json,
            SurchargeAmount::PerKg {
                rate_per_kg: Decimal::new(2, 0)
            }
        );
    }
}
