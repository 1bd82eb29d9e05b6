//! Cell keys
//!
//! A cell is addressed by its normalized `(min, max)` interval. The same
//! derivation is used for authored segments, template items and backend
//! brackets so the three always line up.

use crate::segments::SegmentDraft;
use rust_decimal::Decimal;
use shared::models::{Bracket, WeightSegment};
use shared::parse_decimal;
use std::cmp::Ordering;
use std::fmt;

/// Canonical interval of a matrix cell; `max = None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    min: Decimal,
    max: Option<Decimal>,
}

impl CellKey {
    /// `None` when `max <= min`
    pub fn new(min: Decimal, max: Option<Decimal>) -> Option<Self> {
        if max.is_some_and(|m| m <= min) {
            return None;
        }
        Some(Self {
            min: min.normalize(),
            max: max.map(|m| m.normalize()),
        })
    }

    pub fn min_kg(&self) -> Decimal {
        self.min
    }

    pub fn max_kg(&self) -> Option<Decimal> {
        self.max
    }

    pub fn segment(&self) -> WeightSegment {
        WeightSegment::new(self.min, self.max)
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.min.cmp(&other.min).then_with(|| match (self.max, other.max) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&seg_key(self.min, self.max))
    }
}

/// `"{min}__{max}"` with `INF` for an unbounded max
pub fn seg_key(min: Decimal, max: Option<Decimal>) -> String {
    match max {
        Some(max) => format!("{}__{}", min.normalize(), max.normalize()),
        None => format!("{}__INF", min.normalize()),
    }
}

/// Key of an authored row; unparsable bounds or an empty interval yield `None`
pub fn key_from_segment(segment: &SegmentDraft) -> Option<CellKey> {
    let min = parse_decimal(&segment.min)?;
    let max = match segment.max.trim() {
        "" => None,
        raw => Some(parse_decimal(raw)?),
    };
    CellKey::new(min, max)
}

pub fn key_from_weight_segment(segment: &WeightSegment) -> Option<CellKey> {
    CellKey::new(segment.min, segment.max)
}

/// Key derived from a backend record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKey {
    Cell(CellKey),
    /// Bounds did not parse or describe an empty interval
    Invalid { bracket_id: i64 },
}

impl BracketKey {
    pub fn cell(&self) -> Option<CellKey> {
        match self {
            BracketKey::Cell(key) => Some(*key),
            BracketKey::Invalid { .. } => None,
        }
    }
}

impl fmt::Display for BracketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKey::Cell(key) => key.fmt(f),
            BracketKey::Invalid { bracket_id } => write!(f, "invalid:{bracket_id}"),
        }
    }
}

pub fn key_from_bracket(bracket: &Bracket) -> BracketKey {
    let parsed = || {
        let min = bracket.min_kg.value()?;
        let max = match &bracket.max_kg {
            None => None,
            Some(m) => Some(m.value()?),
        };
        CellKey::new(min, max)
    };
    match parsed() {
        Some(key) => BracketKey::Cell(key),
        None => BracketKey::Invalid {
            bracket_id: bracket.id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::LenientDecimal;
    use shared::models::PricingRule;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_seg_key_format() {
        assert_eq!(seg_key(d("1.0"), Some(d("2.50"))), "1__2.5");
        assert_eq!(seg_key(d("3"), None), "3__INF");
    }

    #[test]
    fn test_segment_and_bracket_agree() {
        let seg = SegmentDraft::new(" 1.00", "2");
        let bracket = Bracket::from_rule(
            9,
            5,
            d("1"),
            Some(d("2.0")),
            &PricingRule::ManualQuote,
            true,
        );
        assert_eq!(
            key_from_segment(&seg),
            key_from_bracket(&bracket).cell()
        );
    }

    #[test]
    fn test_invalid_intervals() {
        assert_eq!(key_from_segment(&SegmentDraft::new("2", "1")), None);
        assert_eq!(key_from_segment(&SegmentDraft::new("abc", "1")), None);
        assert_eq!(key_from_segment(&SegmentDraft::new("0", "x")), None);

        let mut bracket = Bracket::from_rule(4, 5, d("0"), None, &PricingRule::ManualQuote, true);
        bracket.min_kg = LenientDecimal::Invalid("?".to_string());
        let key = key_from_bracket(&bracket);
        assert_eq!(key, BracketKey::Invalid { bracket_id: 4 });
        assert_eq!(key.to_string(), "invalid:4");
    }

    #[test]
    fn test_unbounded_sorts_last() {
        let a = CellKey::new(d("1"), None).unwrap();
        let b = CellKey::new(d("1"), Some(d("5"))).unwrap();
        let c = CellKey::new(d("0"), Some(d("1"))).unwrap();
        let mut keys = vec![a, b, c];
        keys.sort();
        assert_eq!(keys, vec![c, b, a]);
    }

    #[test]
    fn test_bounds_are_normalized() {
        let key = CellKey::new(d("1.50"), Some(d("2.0"))).unwrap();
        assert_eq!(key.min_kg(), d("1.5"));
        assert_eq!(key.max_kg(), Some(d("2")));
        assert_eq!(CellKey::new(d("3"), None).unwrap().max_kg(), None);
    }
}
