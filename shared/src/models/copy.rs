//! Bracket copy payloads

use super::pricing::PricingMode;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// What to do with a target cell that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Skip,
    Overwrite,
}

/// Active flag of copied brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePolicy {
    ForceActive,
    Preserve,
}

/// `POST /zones/{target_zone_id}/brackets:copy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyBracketsRequest {
    pub source_zone_id: i64,
    pub conflict_policy: ConflictPolicy,
    pub active_policy: ActivePolicy,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_modes: Option<Vec<PricingMode>>,
}

/// Per-cell counts of one copy call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySummary {
    #[serde(default)]
    pub created_count: u32,
    #[serde(default)]
    pub updated_count: u32,
    #[serde(default)]
    pub skipped_count: u32,
    #[serde(default)]
    pub failed_count: u32,
}

impl AddAssign for CopySummary {
    fn add_assign(&mut self, rhs: Self) {
        self.created_count += rhs.created_count;
        self.updated_count += rhs.updated_count;
        self.skipped_count += rhs.skipped_count;
        self.failed_count += rhs.failed_count;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyBracketsResult {
    #[serde(default)]
    pub summary: CopySummary,
}
