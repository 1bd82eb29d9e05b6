//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Segment and segment template errors (3xxx)
    Segment,
    /// Zone errors (4xxx)
    Zone,
    /// Bracket errors (5xxx)
    Bracket,
    /// Destination adjustment and surcharge errors (6xxx)
    Adjustment,
    /// Pricing scheme errors (7xxx)
    Scheme,
    /// System errors (8xxx and above)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Segment,
            4000..5000 => Self::Zone,
            5000..6000 => Self::Bracket,
            6000..7000 => Self::Adjustment,
            7000..8000 => Self::Scheme,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Segment => "segment",
            Self::Zone => "zone",
            Self::Bracket => "bracket",
            Self::Adjustment => "adjustment",
            Self::Scheme => "scheme",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Segment);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Zone);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Bracket);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Adjustment);
        assert_eq!(ErrorCategory::from_code(7001), ErrorCategory::Scheme);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::NotAuthenticated.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::TemplateReadOnly.category(),
            ErrorCategory::Segment
        );
        assert_eq!(ErrorCode::ProvinceOccupied.category(), ErrorCategory::Zone);
        assert_eq!(ErrorCode::BracketInUse.category(), ErrorCategory::Bracket);
        assert_eq!(
            ErrorCode::AdjustmentScopeConflict.category(),
            ErrorCategory::Adjustment
        );
        assert_eq!(ErrorCode::SchemeArchived.category(), ErrorCategory::Scheme);
        assert_eq!(ErrorCode::TimeoutError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&ErrorCategory::Bracket).unwrap();
        assert_eq!(json, "\"bracket\"");

        let category: ErrorCategory = serde_json::from_str("\"adjustment\"").unwrap();
        assert_eq!(category, ErrorCategory::Adjustment);
    }
}
