//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound
            | Self::TemplateNotFound
            | Self::ZoneNotFound
            | Self::BracketNotFound
            | Self::AdjustmentNotFound
            | Self::SurchargeNotFound
            | Self::SchemeNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists
            | Self::BracketInUse
            | Self::ProvinceOccupied
            | Self::AdjustmentScopeConflict
            | Self::TemplateReadOnly
            | Self::ZoneArchived
            | Self::SchemeArchived => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired => StatusCode::UNAUTHORIZED,

            Self::PermissionDenied => StatusCode::FORBIDDEN,

            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::RequiredField
            | Self::ValueOutOfRange
            | Self::SegmentInvalid
            | Self::TemplateNotBound
            | Self::BracketKeyInvalid
            | Self::CopySourceInvalid => StatusCode::BAD_REQUEST,

            Self::ManualQuoteRequired => StatusCode::UNPROCESSABLE_ENTITY,

            Self::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            Self::NetworkError => StatusCode::BAD_GATEWAY,

            Self::Unknown | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
