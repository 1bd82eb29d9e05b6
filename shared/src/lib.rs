//! Shared types for the rate platform
//!
//! Wire models for pricing schemes, zones, segment templates and brackets,
//! lenient numeric parsing, the response envelope, and the unified error
//! system used by the rate client and the engine.

pub mod error;
pub mod models;
pub mod response;
pub mod util;
pub mod wire;

// Re-exports
pub use http;
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use response::Envelope;
pub use wire::{LenientDecimal, parse_decimal};
