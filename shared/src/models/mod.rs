//! Data models
//!
//! Shared between the rate client, the engine and the pricing backend (via API).
//! All IDs are `i64`.

pub mod bracket;
pub mod copy;
pub mod dest_adjustment;
pub mod matrix;
pub mod pricing;
pub mod scheme;
pub mod segment;
pub mod segment_template;
pub mod surcharge;
pub mod zone;

// Re-exports
pub use bracket::*;
pub use copy::*;
pub use dest_adjustment::*;
pub use matrix::*;
pub use pricing::*;
pub use scheme::*;
pub use segment::*;
pub use segment_template::*;
pub use surcharge::*;
pub use zone::*;

pub(crate) fn default_true() -> bool {
    true
}
