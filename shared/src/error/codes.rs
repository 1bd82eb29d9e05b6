//! Unified error codes
//!
//! Codes are shared between the pricing backend, the rate client and the
//! engine, and are organized by category (see [`super::ErrorCategory`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for compact serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Segment / Template ====================
    /// Segment list breaks continuity or ordering
    SegmentInvalid = 3001,
    /// Template is published or archived and its items cannot change
    TemplateReadOnly = 3002,
    /// Segment template not found
    TemplateNotFound = 3003,
    /// Zone has no bound segment template
    TemplateNotBound = 3004,

    // ==================== 4xxx: Zone ====================
    /// Zone not found
    ZoneNotFound = 4001,
    /// Zone is archived
    ZoneArchived = 4002,
    /// Province already belongs to another active zone
    ProvinceOccupied = 4003,

    // ==================== 5xxx: Bracket ====================
    /// Bracket not found
    BracketNotFound = 5001,
    /// Bracket is still referenced and cannot be deleted
    BracketInUse = 5002,
    /// Bracket interval cannot produce a key
    BracketKeyInvalid = 5003,
    /// Copy source is missing or equals the target
    CopySourceInvalid = 5004,
    /// Cell is a manual quote placeholder
    ManualQuoteRequired = 5005,

    // ==================== 6xxx: Adjustment ====================
    /// Province-scope and city-scope adjustments overlap
    AdjustmentScopeConflict = 6001,
    /// Destination adjustment not found
    AdjustmentNotFound = 6002,
    /// Surcharge not found
    SurchargeNotFound = 6003,

    // ==================== 7xxx: Scheme ====================
    /// Pricing scheme not found
    SchemeNotFound = 7001,
    /// Pricing scheme is archived
    SchemeArchived = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Request timed out
    TimeoutError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Segment / Template
            ErrorCode::SegmentInvalid => "Weight segments are not contiguous",
            ErrorCode::TemplateReadOnly => "Segment template is read-only",
            ErrorCode::TemplateNotFound => "Segment template not found",
            ErrorCode::TemplateNotBound => "Zone has no bound segment template",

            // Zone
            ErrorCode::ZoneNotFound => "Zone not found",
            ErrorCode::ZoneArchived => "Zone is archived",
            ErrorCode::ProvinceOccupied => "Province already belongs to another active zone",

            // Bracket
            ErrorCode::BracketNotFound => "Bracket not found",
            ErrorCode::BracketInUse => "Bracket is still referenced",
            ErrorCode::BracketKeyInvalid => "Bracket interval is invalid",
            ErrorCode::CopySourceInvalid => "Copy source zone is invalid",
            ErrorCode::ManualQuoteRequired => "Manual quote required",

            // Adjustment
            ErrorCode::AdjustmentScopeConflict => {
                "Province and city adjustments conflict for the same destination"
            }
            ErrorCode::AdjustmentNotFound => "Destination adjustment not found",
            ErrorCode::SurchargeNotFound => "Surcharge not found",

            // Scheme
            ErrorCode::SchemeNotFound => "Pricing scheme not found",
            ErrorCode::SchemeArchived => "Pricing scheme is archived",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when a u16 does not name a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Segment / Template
            3001 => Ok(ErrorCode::SegmentInvalid),
            3002 => Ok(ErrorCode::TemplateReadOnly),
            3003 => Ok(ErrorCode::TemplateNotFound),
            3004 => Ok(ErrorCode::TemplateNotBound),

            // Zone
            4001 => Ok(ErrorCode::ZoneNotFound),
            4002 => Ok(ErrorCode::ZoneArchived),
            4003 => Ok(ErrorCode::ProvinceOccupied),

            // Bracket
            5001 => Ok(ErrorCode::BracketNotFound),
            5002 => Ok(ErrorCode::BracketInUse),
            5003 => Ok(ErrorCode::BracketKeyInvalid),
            5004 => Ok(ErrorCode::CopySourceInvalid),
            5005 => Ok(ErrorCode::ManualQuoteRequired),

            // Adjustment
            6001 => Ok(ErrorCode::AdjustmentScopeConflict),
            6002 => Ok(ErrorCode::AdjustmentNotFound),
            6003 => Ok(ErrorCode::SurchargeNotFound),

            // Scheme
            7001 => Ok(ErrorCode::SchemeNotFound),
            7002 => Ok(ErrorCode::SchemeArchived),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
