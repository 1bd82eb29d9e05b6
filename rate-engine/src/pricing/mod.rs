//! Pricing rules: drafts, validation, calculation and summaries

pub mod calculator;
pub mod draft;
pub mod summary;

pub use calculator::{CellPrice, DECIMAL_PLACES, compute_price, round_money};
pub use draft::{
    DraftError, RowDraft, build_payload_from_draft, draft_from_bracket, draft_from_rule,
    validate_draft_for_save,
};
pub use summary::{format_money, summarize_bracket, summarize_draft, summarize_rule};
