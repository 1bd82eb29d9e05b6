//! Unified error system for the rate platform
//!
//! - [`ErrorCode`]: Standardized error codes shared by the backend and clients
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Segment / template errors
//! - 4xxx: Zone errors
//! - 5xxx: Bracket errors
//! - 6xxx: Destination adjustment / surcharge errors
//! - 7xxx: Pricing scheme errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::BracketNotFound);
//!
//! let err = AppError::validation("rate per kg required")
//!     .with_detail("field", "rate_per_kg");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(2));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
