//! One-line summaries of cell rules for listings and the CLI

use super::calculator::round_money;
use super::draft::{RowDraft, draft_from_bracket};
use rust_decimal::Decimal;
use shared::models::{Bracket, PricingMode, PricingRule};
use shared::parse_decimal;

const MANUAL_QUOTE: &str = "manual quote";

/// `¥` amount with exactly two decimals
pub fn format_money(value: Decimal) -> String {
    let mut v = round_money(value);
    v.rescale(2);
    format!("¥{v}")
}

fn money_text(raw: &str) -> String {
    match parse_decimal(raw) {
        Some(v) => format_money(v),
        None => "¥?".to_string(),
    }
}

fn kg_text(raw: &str) -> String {
    match parse_decimal(raw) {
        Some(v) => v.normalize().to_string(),
        None => "?".to_string(),
    }
}

pub fn summarize_draft(draft: &RowDraft) -> String {
    match draft {
        RowDraft::Flat { amount } => money_text(amount),
        RowDraft::LinearTotal {
            base_amount,
            rate_per_kg,
        } => format!(
            "base {} + {}/kg",
            money_text(base_amount),
            money_text(rate_per_kg)
        ),
        RowDraft::StepOver {
            base_kg,
            base_amount,
            rate_per_kg,
        } => format!(
            "first {}kg {} + {}/kg over",
            kg_text(base_kg),
            money_text(base_amount),
            money_text(rate_per_kg)
        ),
        RowDraft::ManualQuote => MANUAL_QUOTE.to_string(),
    }
}

pub fn summarize_rule(rule: &PricingRule) -> String {
    summarize_draft(&super::draft::draft_from_rule(rule))
}

/// Summary of a backend record; an unknown mode reads as manual quote
pub fn summarize_bracket(bracket: &Bracket) -> String {
    if bracket.pricing_mode.is_none() {
        return MANUAL_QUOTE.to_string();
    }
    summarize_draft(&draft_from_bracket(bracket, PricingMode::ManualQuote))
}
