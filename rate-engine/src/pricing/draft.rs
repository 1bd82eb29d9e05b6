//! Cell drafts
//!
//! A draft is the unsaved edit of one cell. Amounts stay as text until save;
//! [`validate_draft_for_save`] is the only way to turn a draft into a
//! [`PricingRule`], and it never invents a zero for a missing field.

use rust_decimal::Decimal;
use shared::LenientDecimal;
use shared::models::{Bracket, PricingMode, PricingRule};
use shared::parse_decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDraft {
    Flat {
        amount: String,
    },
    LinearTotal {
        base_amount: String,
        rate_per_kg: String,
    },
    StepOver {
        base_kg: String,
        base_amount: String,
        rate_per_kg: String,
    },
    ManualQuote,
}

impl RowDraft {
    /// Blank draft of the given mode
    pub fn empty(mode: PricingMode) -> Self {
        match mode {
            PricingMode::Flat => RowDraft::Flat {
                amount: String::new(),
            },
            PricingMode::LinearTotal => RowDraft::LinearTotal {
                base_amount: String::new(),
                rate_per_kg: String::new(),
            },
            PricingMode::StepOver => RowDraft::StepOver {
                base_kg: String::new(),
                base_amount: String::new(),
                rate_per_kg: String::new(),
            },
            PricingMode::ManualQuote => RowDraft::ManualQuote,
        }
    }

    pub fn mode(&self) -> PricingMode {
        match self {
            RowDraft::Flat { .. } => PricingMode::Flat,
            RowDraft::LinearTotal { .. } => PricingMode::LinearTotal,
            RowDraft::StepOver { .. } => PricingMode::StepOver,
            RowDraft::ManualQuote => PricingMode::ManualQuote,
        }
    }

    /// Same draft with every parsable field rewritten in canonical form
    pub fn normalized(&self) -> Self {
        match self {
            RowDraft::Flat { amount } => RowDraft::Flat {
                amount: normalize_text(amount),
            },
            RowDraft::LinearTotal {
                base_amount,
                rate_per_kg,
            } => RowDraft::LinearTotal {
                base_amount: normalize_text(base_amount),
                rate_per_kg: normalize_text(rate_per_kg),
            },
            RowDraft::StepOver {
                base_kg,
                base_amount,
                rate_per_kg,
            } => RowDraft::StepOver {
                base_kg: normalize_text(base_kg),
                base_amount: normalize_text(base_amount),
                rate_per_kg: normalize_text(rate_per_kg),
            },
            RowDraft::ManualQuote => RowDraft::ManualQuote,
        }
    }
}

fn normalize_text(raw: &str) -> String {
    match parse_decimal(raw) {
        Some(d) => d.normalize().to_string(),
        None => raw.trim().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("flat amount required")]
    FlatAmountRequired,
    #[error("flat amount must be a number ≥ 0")]
    FlatAmountInvalid,
    #[error("base amount required")]
    BaseAmountRequired,
    #[error("base amount must be a number ≥ 0")]
    BaseAmountInvalid,
    #[error("rate per kg required")]
    RatePerKgRequired,
    #[error("rate per kg must be a number ≥ 0")]
    RatePerKgInvalid,
    #[error("base kg required")]
    BaseKgRequired,
    #[error("base kg must be a number > 0")]
    BaseKgInvalid,
}

fn required(
    raw: &str,
    missing: DraftError,
    invalid: DraftError,
    accept: impl Fn(Decimal) -> bool,
) -> Result<Decimal, DraftError> {
    if raw.trim().is_empty() {
        return Err(missing);
    }
    parse_decimal(raw).filter(|d| accept(*d)).ok_or(invalid)
}

fn non_negative(d: Decimal) -> bool {
    d >= Decimal::ZERO
}

/// Check a cell draft before any write and build its rule
///
/// A cell without a draft is validated as a blank draft of `fallback`, so it
/// passes only when `fallback` is manual quote. The first violated rule wins.
pub fn validate_draft_for_save(
    draft: Option<&RowDraft>,
    fallback: PricingMode,
) -> Result<PricingRule, DraftError> {
    let blank;
    let draft = match draft {
        Some(d) => d,
        None => {
            blank = RowDraft::empty(fallback);
            &blank
        }
    };

    match draft {
        RowDraft::Flat { amount } => Ok(PricingRule::Flat {
            flat_amount: required(
                amount,
                DraftError::FlatAmountRequired,
                DraftError::FlatAmountInvalid,
                non_negative,
            )?,
        }),
        RowDraft::LinearTotal {
            base_amount,
            rate_per_kg,
        } => Ok(PricingRule::LinearTotal {
            base_amount: required(
                base_amount,
                DraftError::BaseAmountRequired,
                DraftError::BaseAmountInvalid,
                non_negative,
            )?,
            rate_per_kg: required(
                rate_per_kg,
                DraftError::RatePerKgRequired,
                DraftError::RatePerKgInvalid,
                non_negative,
            )?,
        }),
        RowDraft::StepOver {
            base_kg,
            base_amount,
            rate_per_kg,
        } => Ok(PricingRule::StepOver {
            base_kg: required(
                base_kg,
                DraftError::BaseKgRequired,
                DraftError::BaseKgInvalid,
                |d| d > Decimal::ZERO,
            )?,
            base_amount: required(
                base_amount,
                DraftError::BaseAmountRequired,
                DraftError::BaseAmountInvalid,
                non_negative,
            )?,
            rate_per_kg: required(
                rate_per_kg,
                DraftError::RatePerKgRequired,
                DraftError::RatePerKgInvalid,
                non_negative,
            )?,
        }),
        RowDraft::ManualQuote => Ok(PricingRule::ManualQuote),
    }
}

/// Wire rule for a draft; carries only the fields of the draft's mode
pub fn build_payload_from_draft(draft: &RowDraft) -> Result<PricingRule, DraftError> {
    validate_draft_for_save(Some(draft), draft.mode())
}

pub fn draft_from_rule(rule: &PricingRule) -> RowDraft {
    let text = |d: &Decimal| d.normalize().to_string();
    match rule {
        PricingRule::Flat { flat_amount } => RowDraft::Flat {
            amount: text(flat_amount),
        },
        PricingRule::LinearTotal {
            base_amount,
            rate_per_kg,
        } => RowDraft::LinearTotal {
            base_amount: text(base_amount),
            rate_per_kg: text(rate_per_kg),
        },
        PricingRule::StepOver {
            base_kg,
            base_amount,
            rate_per_kg,
        } => RowDraft::StepOver {
            base_kg: text(base_kg),
            base_amount: text(base_amount),
            rate_per_kg: text(rate_per_kg),
        },
        PricingRule::ManualQuote => RowDraft::ManualQuote,
    }
}

fn field_text(field: &Option<LenientDecimal>) -> String {
    field.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Editable view of a backend bracket
///
/// Only `pricing_mode` decides which amount fields are read; `price_json` is
/// ignored. An unknown or missing mode falls back to a blank `fallback`
/// draft. Unparsable amounts keep their raw text so saving surfaces them.
pub fn draft_from_bracket(bracket: &Bracket, fallback: PricingMode) -> RowDraft {
    match bracket.pricing_mode {
        Some(PricingMode::Flat) => RowDraft::Flat {
            amount: field_text(&bracket.flat_amount),
        },
        Some(PricingMode::LinearTotal) => RowDraft::LinearTotal {
            base_amount: field_text(&bracket.base_amount),
            rate_per_kg: field_text(&bracket.rate_per_kg),
        },
        Some(PricingMode::StepOver) => RowDraft::StepOver {
            base_kg: field_text(&bracket.base_kg),
            base_amount: field_text(&bracket.base_amount),
            rate_per_kg: field_text(&bracket.rate_per_kg),
        },
        Some(PricingMode::ManualQuote) => RowDraft::ManualQuote,
        None => RowDraft::empty(fallback),
    }
}
