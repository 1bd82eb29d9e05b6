//! Client error types

use http::StatusCode;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// No response within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
        detail: Option<Value>,
    },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT.as_u16())
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// `detail.code` of a structured error body
    pub fn detail_code(&self) -> Option<&str> {
        match self {
            ClientError::Api {
                detail: Some(detail),
                ..
            } => detail.get("code").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Ids listed in `detail.conflicts[].id`
    pub fn conflict_ids(&self) -> Vec<i64> {
        match self {
            ClientError::Api {
                detail: Some(detail),
                ..
            } => detail
                .get("conflicts")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|c| c.get("id").and_then(Value::as_i64))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        ClientError::Api {
            status: err.http_status().as_u16(),
            code: Some(err.code),
            detail: err.detail_value(),
            message: err.message,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
