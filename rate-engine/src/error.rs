//! Engine error type and its user-facing translation

use crate::pricing::DraftError;
use crate::quote::QuoteError;
use crate::segments::SegmentError;
use crate::workbench::ZoneSaveReport;
use rate_client::ClientError;
use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Local rule violated before any request was made
    #[error("{0}")]
    Validation(String),

    /// The backend refused because other records conflict
    #[error("conflict ({}): {message}", .code.as_deref().unwrap_or("409"))]
    Conflict {
        code: Option<String>,
        ids: Vec<i64>,
        message: String,
    },

    /// Delete blocked by a reference still pointing at the record
    #[error("still referenced: {0}")]
    ReferenceInUse(String),

    #[error("{0} is archived")]
    Archived(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("request timed out")]
    Timeout,

    /// A whole-zone save stopped at `label`; the cells counted in `saved` stay written
    #[error("{label}: {source} ({} created, {} updated before the failure)", .saved.created, .saved.updated)]
    PartialSave {
        label: String,
        saved: ZoneSaveReport,
        source: Box<EngineError>,
    },

    #[error(transparent)]
    Client(ClientError),
}

pub type EngineResult<T> = Result<T, EngineError>;

fn is_reference_error(code: Option<ErrorCode>, message: &str) -> bool {
    if code == Some(ErrorCode::BracketInUse) {
        return true;
    }
    let lower = message.to_ascii_lowercase();
    ["foreign key", "restrict", "still referenced", "is referenced"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        if matches!(err, ClientError::Timeout) {
            return EngineError::Timeout;
        }
        let ids = err.conflict_ids();
        if !ids.is_empty() {
            return EngineError::Conflict {
                code: err.detail_code().map(str::to_string),
                ids,
                message: err.to_string(),
            };
        }
        if let ClientError::Api { code, message, .. } = &err {
            if is_reference_error(*code, message) {
                return EngineError::ReferenceInUse(message.clone());
            }
            if err.is_conflict() {
                return EngineError::Conflict {
                    code: err.detail_code().map(str::to_string),
                    ids,
                    message: message.clone(),
                };
            }
            if err.is_not_found() {
                return EngineError::NotFound(message.clone());
            }
        }
        EngineError::Client(err)
    }
}

impl EngineError {
    /// Errors raised locally before any request
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Segment(_)
                | EngineError::Draft(_)
                | EngineError::Validation(_)
                | EngineError::Archived(_)
        )
    }

    /// Closest unified error code
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Segment(SegmentError::TemplateReadOnly { .. }) => {
                ErrorCode::TemplateReadOnly
            }
            EngineError::Segment(_) => ErrorCode::SegmentInvalid,
            EngineError::Draft(_) | EngineError::Validation(_) => ErrorCode::ValidationFailed,
            EngineError::Quote(e) => e.code(),
            EngineError::Conflict { code, .. } => match code.as_deref() {
                Some("province_occupied") => ErrorCode::ProvinceOccupied,
                Some("dest_adjustment_scope_conflict") => ErrorCode::AdjustmentScopeConflict,
                _ => ErrorCode::AlreadyExists,
            },
            EngineError::ReferenceInUse(_) => ErrorCode::BracketInUse,
            EngineError::Archived(_) => ErrorCode::SchemeArchived,
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::Timeout => ErrorCode::TimeoutError,
            EngineError::PartialSave { source, .. } => source.code(),
            EngineError::Client(ClientError::Api { code: Some(code), .. }) => *code,
            EngineError::Client(_) => ErrorCode::NetworkError,
        }
    }

    /// One string to show the operator
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Conflict { ids, .. } if !ids.is_empty() => {
                let list = ids
                    .iter()
                    .map(|id| format!("#{id}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("conflicting active rule(s) {list}; deactivate them first")
            }
            EngineError::Conflict { message, .. } => {
                format!("conflict with existing data: {message}")
            }
            EngineError::ReferenceInUse(_) => {
                "this bracket is still referenced; deactivate it instead of deleting".to_string()
            }
            EngineError::Timeout => {
                "request timed out; check your connection and retry (the change may already have been applied)"
                    .to_string()
            }
            EngineError::Archived(what) => format!("{what} is archived and read-only"),
            EngineError::Client(ClientError::Api {
                code: Some(ErrorCode::NotAuthenticated | ErrorCode::TokenExpired),
                ..
            }) => "session expired or missing; sign in again (check RATE_API_TOKEN)".to_string(),
            EngineError::Client(ClientError::Api {
                code: Some(ErrorCode::PermissionDenied),
                ..
            }) => "this account may not change pricing for the scheme".to_string(),
            EngineError::PartialSave {
                label,
                saved,
                source,
            } => format!(
                "{label}: {} ({} created, {} updated before the failure)",
                source.user_message(),
                saved.created,
                saved.updated
            ),
            other => other.to_string(),
        }
    }
}
