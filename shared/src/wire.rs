//! Defensive numeric parsing at the wire boundary
//!
//! Money and weight fields arrive as JSON numbers or as strings
//! (`8`, `"8.00"`, `" 1.5 "`, `"1e1"`). Anything that is not a finite
//! number is kept as [`LenientDecimal::Invalid`] so the caller can render
//! it as broken instead of silently reading zero.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Parse user or wire text into a finite decimal
///
/// Empty (after trimming) and non-finite inputs yield `None`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = Decimal::from_str(s) {
        return Some(d);
    }
    if let Ok(d) = Decimal::from_scientific(s) {
        return Some(d);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Decimal::try_from(f).ok(),
        _ => None,
    }
}

/// Parse a JSON value into a finite decimal
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// A numeric field that survived deserialization whether or not it parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LenientDecimal {
    Valid(Decimal),
    /// Raw text of a value that is not a finite number
    Invalid(String),
}

impl LenientDecimal {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            LenientDecimal::Valid(d) => Some(*d),
            LenientDecimal::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, LenientDecimal::Valid(_))
    }
}

impl From<Decimal> for LenientDecimal {
    fn from(d: Decimal) -> Self {
        LenientDecimal::Valid(d)
    }
}

impl From<&Value> for LenientDecimal {
    fn from(value: &Value) -> Self {
        match decimal_from_value(value) {
            Some(d) => LenientDecimal::Valid(d),
            None => {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tracing::debug!(raw = %raw, "Non-numeric value kept as invalid");
                LenientDecimal::Invalid(raw)
            }
        }
    }
}

impl fmt::Display for LenientDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LenientDecimal::Valid(d) => write!(f, "{}", d.normalize()),
            LenientDecimal::Invalid(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for LenientDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LenientDecimal::Valid(d) => match d.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_str(&d.to_string()),
            },
            LenientDecimal::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for LenientDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(LenientDecimal::from(&value))
    }
}

/// Deserialize an optional lenient decimal where `null` and absent both mean `None`
pub fn lenient_option<'de, D>(deserializer: D) -> Result<Option<LenientDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(LenientDecimal::from(&v)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_decimal_accepts_common_shapes() {
        assert_eq!(parse_decimal("8"), Some(d("8")));
        assert_eq!(parse_decimal(" 8.00 "), Some(d("8")));
        assert_eq!(parse_decimal("1e1"), Some(d("10")));
        assert_eq!(parse_decimal("-0.5"), Some(d("-0.5")));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_lenient_from_number_and_string() {
        let n: LenientDecimal = serde_json::from_str("2.5").unwrap();
        assert_eq!(n.value(), Some(d("2.5")));
        let s: LenientDecimal = serde_json::from_str("\"2.50\"").unwrap();
        assert_eq!(s.value(), Some(d("2.5")));
    }

    #[test]
    fn test_lenient_keeps_invalid_text() {
        let bad: LenientDecimal = serde_json::from_str("\"x1\"").unwrap();
        assert_eq!(bad, LenientDecimal::Invalid("x1".to_string()));
        let obj: LenientDecimal = serde_json::from_str("{}").unwrap();
        assert!(!obj.is_valid());
    }

    #[test]
    fn test_lenient_serializes_as_number() {
        let json = serde_json::to_string(&LenientDecimal::Valid(d("8"))).unwrap();
        assert_eq!(json, "8.0");
    }

    #[test]
    fn test_display_normalizes() {
        assert_eq!(LenientDecimal::Valid(d("1.50")).to_string(), "1.5");
        assert_eq!(LenientDecimal::Valid(d("2.0")).to_string(), "2");
    }
}
