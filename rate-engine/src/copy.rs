//! Bulk bracket copy
//!
//! One server-side copy per target, strictly in order, so every failure is
//! attributed to exactly one target. A failing or stalled target does not
//! stop the run.

use crate::error::{EngineError, EngineResult};
use rate_client::RateApi;
use shared::models::{ActivePolicy, ConflictPolicy, CopyBracketsRequest, CopySummary, PricingMode};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    pub conflict_policy: ConflictPolicy,
    pub active_policy: ActivePolicy,
    pub include_inactive: bool,
    /// Copy only brackets of these modes
    pub pricing_modes: Option<Vec<PricingMode>>,
    /// Limit for each target's request; an elapsed limit fails that target only
    pub target_timeout: Option<Duration>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Skip,
            active_policy: ActivePolicy::ForceActive,
            include_inactive: false,
            pricing_modes: None,
            target_timeout: None,
        }
    }
}

impl CopyOptions {
    pub fn overwrite() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Overwrite,
            ..Self::default()
        }
    }

    pub fn with_target_timeout(mut self, limit: Duration) -> Self {
        self.target_timeout = Some(limit);
        self
    }

    fn request(&self, source_zone_id: i64) -> CopyBracketsRequest {
        CopyBracketsRequest {
            source_zone_id,
            conflict_policy: self.conflict_policy,
            active_policy: self.active_policy,
            include_inactive: self.include_inactive,
            pricing_modes: self.pricing_modes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Copied(CopySummary),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub zone_id: i64,
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub source_zone_id: i64,
    /// Cell counts summed over every target that answered
    pub totals: CopySummary,
    pub targets: Vec<TargetReport>,
}

impl CopyReport {
    pub fn failures(&self) -> impl Iterator<Item = (i64, &str)> {
        self.targets.iter().filter_map(|t| match &t.outcome {
            TargetOutcome::Failed(msg) => Some((t.zone_id, msg.as_str())),
            TargetOutcome::Copied(_) => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn summary_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.totals;
        write!(
            f,
            "created {} / updated {} / skipped {} / failed {}",
            t.created_count, t.updated_count, t.skipped_count, t.failed_count
        )?;
        for (zone_id, msg) in self.failures() {
            write!(f, "; zone {zone_id} failed: {msg}")?;
        }
        Ok(())
    }
}

/// Copy every bracket of `source_zone_id` onto each target in turn
///
/// Rejects an empty target list and a source listed as its own target
/// before issuing any request. Duplicate targets are copied once.
pub async fn copy_to_targets<A>(
    api: &A,
    source_zone_id: i64,
    targets: &[i64],
    options: &CopyOptions,
) -> EngineResult<CopyReport>
where
    A: RateApi + ?Sized,
{
    if targets.is_empty() {
        return Err(EngineError::Validation(
            "select at least one target zone".to_string(),
        ));
    }
    if targets.contains(&source_zone_id) {
        return Err(EngineError::Validation(format!(
            "zone {source_zone_id} cannot be both source and target"
        )));
    }

    let mut ordered: Vec<i64> = Vec::with_capacity(targets.len());
    for id in targets {
        if !ordered.contains(id) {
            ordered.push(*id);
        }
    }

    let request = options.request(source_zone_id);
    let mut report = CopyReport {
        source_zone_id,
        totals: CopySummary::default(),
        targets: Vec::with_capacity(ordered.len()),
    };

    for zone_id in ordered {
        let call = api.copy_brackets(zone_id, &request);
        let result = match options.target_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(r) => r.map_err(EngineError::from),
                Err(_) => Err(EngineError::Timeout),
            },
            None => call.await.map_err(EngineError::from),
        };
        let outcome = match result {
            Ok(result) => {
                tracing::info!(
                    source_zone_id,
                    zone_id,
                    created = result.summary.created_count,
                    updated = result.summary.updated_count,
                    skipped = result.summary.skipped_count,
                    "Brackets copied"
                );
                report.totals += result.summary;
                TargetOutcome::Copied(result.summary)
            }
            Err(err) => {
                tracing::warn!(source_zone_id, zone_id, error = %err, "Bracket copy failed");
                TargetOutcome::Failed(err.user_message())
            }
        };
        report.targets.push(TargetReport { zone_id, outcome });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_lists_failures() {
        let report = CopyReport {
            source_zone_id: 1,
            totals: CopySummary {
                created_count: 2,
                updated_count: 0,
                skipped_count: 1,
                failed_count: 0,
            },
            targets: vec![
                TargetReport {
                    zone_id: 2,
                    outcome: TargetOutcome::Copied(CopySummary::default()),
                },
                TargetReport {
                    zone_id: 3,
                    outcome: TargetOutcome::Failed("boom".to_string()),
                },
            ],
        };
        assert_eq!(
            report.summary_line(),
            "created 2 / updated 0 / skipped 1 / failed 0; zone 3 failed: boom"
        );
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_overwrite_options() {
        let req = CopyOptions::overwrite().request(4);
        assert_eq!(req.conflict_policy, ConflictPolicy::Overwrite);
        assert_eq!(req.source_zone_id, 4);
        assert!(!req.include_inactive);
    }
}
