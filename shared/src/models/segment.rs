//! Weight Segment Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A priced weight interval
///
/// Interval is `(min, max]`, except the first segment of a list which is
/// `[0, max]`. `max = None` is unbounded and only valid as the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightSegment {
    #[serde(with = "rust_decimal::serde::float")]
    pub min: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub max: Option<Decimal>,
}

impl WeightSegment {
    pub fn new(min: Decimal, max: Option<Decimal>) -> Self {
        Self { min, max }
    }

    /// Whether `weight` falls in this segment
    ///
    /// `closed_at_min` is set for the first segment of a list.
    pub fn contains(&self, weight: Decimal, closed_at_min: bool) -> bool {
        let above_min = if closed_at_min {
            weight >= self.min
        } else {
            weight > self.min
        };
        above_min && self.max.is_none_or(|max| weight <= max)
    }
}
