//! Segment Template Model

use super::default_true;
use super::segment::WeightSegment;
use crate::wire::{LenientDecimal, lenient_option};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Template lifecycle (段模板状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    Published,
    Archived,
}

/// One row of a segment template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: i64,
    #[serde(default)]
    pub ord: i32,
    pub min_kg: LenientDecimal,
    #[serde(default, deserialize_with = "lenient_option")]
    pub max_kg: Option<LenientDecimal>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl TemplateItem {
    /// The item as a weight segment, when both bounds parse
    pub fn segment(&self) -> Option<WeightSegment> {
        let min = self.min_kg.value()?;
        let max = match &self.max_kg {
            None => None,
            Some(m) => Some(m.value()?),
        };
        Some(WeightSegment::new(min, max))
    }
}

/// Reusable segment list bound to zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTemplate {
    pub id: i64,
    pub scheme_id: i64,
    pub name: String,
    pub status: TemplateStatus,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

impl SegmentTemplate {
    /// Items ordered by `ord`
    pub fn sorted_items(&self) -> Vec<&TemplateItem> {
        let mut items: Vec<&TemplateItem> = self.items.iter().collect();
        items.sort_by_key(|i| (i.ord, i.id));
        items
    }

    /// Items may only change while the template is a draft
    pub fn items_editable(&self) -> bool {
        self.status == TemplateStatus::Draft
    }
}

/// Create template payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTemplateCreate {
    pub name: String,
}

/// One row of a `PUT /segment-templates/{id}/items` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItemInput {
    pub ord: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub max_kg: Option<Decimal>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserialize_and_sort() {
        let json = r#"{
            "id": 9, "scheme_id": 1, "name": "default", "status": "published", "is_active": true,
            "items": [
                {"id": 2, "ord": 1, "min_kg": "1", "max_kg": null, "active": true},
                {"id": 1, "ord": 0, "min_kg": 0, "max_kg": "1"}
            ]
        }"#;
        let t: SegmentTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(t.status, TemplateStatus::Published);
        assert!(!t.items_editable());
        let ids: Vec<i64> = t.sorted_items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            t.sorted_items()[1].segment(),
            Some(WeightSegment::new(Decimal::ONE, None))
        );
    }

    #[test]
    fn test_item_with_garbled_bound_has_no_segment() {
        let item = TemplateItem {
            id: 1,
            ord: 0,
            min_kg: LenientDecimal::Invalid("x".into()),
            max_kg: None,
            active: true,
        };
        assert_eq!(item.segment(), None);
    }
}
