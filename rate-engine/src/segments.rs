//! Weight segment model
//!
//! A segment list partitions the weight axis: the first segment is `[0, max]`,
//! every later one is `(prev.max, max]`, and only the last may be unbounded.
//! Rows are authored as text; `min` is derived from the previous `max` on save.

use rust_decimal::Decimal;
use shared::models::{SegmentTemplate, WeightSegment};
use shared::parse_decimal;
use thiserror::Error;

/// One authored row, numeric fields kept as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentDraft {
    pub min: String,
    pub max: String,
}

impl SegmentDraft {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn from_segment(segment: &WeightSegment) -> Self {
        Self {
            min: segment.min.normalize().to_string(),
            max: segment
                .max
                .map(|m| m.normalize().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("at least one weight segment is required")]
    Empty,

    #[error("row 1: max must be a number > 0")]
    FirstMaxNotPositive,

    #[error("row 1 is unbounded, no further segments may follow")]
    UnboundedFirst,

    #[error("row {row}: only the last row may leave max empty")]
    MissingMax { row: usize },

    #[error("row {row}: max must be a number > 0")]
    MaxNotPositive { row: usize },

    #[error("row {row}: max must be greater than the previous max ({previous})")]
    MaxNotIncreasing { row: usize, previous: String },

    #[error("row {row}: min must be a number")]
    MinNotNumber { row: usize },

    #[error("row 1: min must be 0")]
    FirstMinNotZero,

    #[error("row {row}: min {found} must equal previous max {expected}")]
    Discontinuous {
        row: usize,
        expected: String,
        found: String,
    },

    #[error("template {template_id} is {status}, its items are read-only")]
    TemplateReadOnly { template_id: i64, status: String },
}

/// Validate an authored segment list
///
/// Checks max values first (presence, positivity, strict increase), then
/// continuity of any authored `min`. An empty `min` is accepted since
/// [`normalize_for_save`] derives it.
pub fn validate_segments(list: &[SegmentDraft]) -> Result<(), SegmentError> {
    let Some(first) = list.first() else {
        return Err(SegmentError::Empty);
    };

    let first_max = first.max.trim();
    if first_max.is_empty() {
        if list.len() > 1 {
            return Err(SegmentError::UnboundedFirst);
        }
    } else if !parse_decimal(first_max).is_some_and(|m| m > Decimal::ZERO) {
        return Err(SegmentError::FirstMaxNotPositive);
    }

    let last = list.len() - 1;
    let mut previous = parse_decimal(first_max);
    for (i, row) in list.iter().enumerate().skip(1) {
        let row_no = i + 1;
        let raw = row.max.trim();
        if raw.is_empty() {
            if i != last {
                return Err(SegmentError::MissingMax { row: row_no });
            }
            continue;
        }
        let max = parse_decimal(raw)
            .filter(|m| *m > Decimal::ZERO)
            .ok_or(SegmentError::MaxNotPositive { row: row_no })?;
        if let Some(prev) = previous
            && max <= prev
        {
            return Err(SegmentError::MaxNotIncreasing {
                row: row_no,
                previous: prev.normalize().to_string(),
            });
        }
        previous = Some(max);
    }

    check_continuity(list)
}

fn check_continuity(list: &[SegmentDraft]) -> Result<(), SegmentError> {
    let mut expected = Decimal::ZERO;
    for (i, row) in list.iter().enumerate() {
        let row_no = i + 1;
        let raw = row.min.trim();
        if !raw.is_empty() {
            let min = parse_decimal(raw).ok_or(SegmentError::MinNotNumber { row: row_no })?;
            if min != expected {
                return Err(if i == 0 {
                    SegmentError::FirstMinNotZero
                } else {
                    SegmentError::Discontinuous {
                        row: row_no,
                        expected: expected.normalize().to_string(),
                        found: min.normalize().to_string(),
                    }
                });
            }
        }
        match parse_decimal(&row.max) {
            Some(max) => expected = max,
            None => break,
        }
    }
    Ok(())
}

/// Rewrite every `min` as the previous row's `max`
///
/// The first `min` becomes `0`. Rows after an unbounded one are dropped.
pub fn normalize_for_save(list: &[SegmentDraft]) -> Vec<SegmentDraft> {
    let mut out = Vec::with_capacity(list.len());
    let mut previous_max: Option<String> = Some("0".to_string());
    for row in list {
        let Some(min) = previous_max.take() else {
            break;
        };
        let max = row.max.trim().to_string();
        previous_max = (!max.is_empty()).then(|| max.clone());
        out.push(SegmentDraft { min, max });
    }
    out
}

/// Validate, normalize and parse into typed segments
pub fn to_weight_segments(list: &[SegmentDraft]) -> Result<Vec<WeightSegment>, SegmentError> {
    validate_segments(list)?;
    normalize_for_save(list)
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let min = parse_decimal(&row.min).ok_or(SegmentError::MinNotNumber { row: i + 1 })?;
            let max = match row.max.trim() {
                "" => None,
                raw => Some(parse_decimal(raw).ok_or(SegmentError::MaxNotPositive { row: i + 1 })?),
            };
            Ok(WeightSegment::new(min, max))
        })
        .collect()
}

/// Interval label `min<w≤max`, or `w>min` when unbounded
pub fn label_left_open_right_closed(min: &str, max: &str) -> String {
    let min = min.trim();
    let max = max.trim();
    match (min.is_empty(), max.is_empty()) {
        (true, true) => "undefined".to_string(),
        (_, true) => format!("w>{min}"),
        _ => format!("{}<w≤{max}", if min.is_empty() { "0" } else { min }),
    }
}

pub fn segment_label(segment: &WeightSegment) -> String {
    let draft = SegmentDraft::from_segment(segment);
    label_left_open_right_closed(&draft.min, &draft.max)
}

/// Reject item edits on a template that has left draft status
pub fn ensure_items_editable(template: &SegmentTemplate) -> Result<(), SegmentError> {
    if template.items_editable() {
        return Ok(());
    }
    Err(SegmentError::TemplateReadOnly {
        template_id: template.id,
        status: format!("{:?}", template.status).to_lowercase(),
    })
}
