//! Zone × segment matrix
//!
//! Pure projection of a scheme's zones onto the segment templates they are
//! bound to. Nothing here writes; inactive and archived zones are counted
//! and left out, zones without a usable template are listed separately.

use crate::keys::{BracketKey, CellKey, key_from_bracket, key_from_weight_segment};
use crate::segments::segment_label;
use shared::models::{Bracket, SegmentTemplate, TemplateItem, Zone, ZoneBracketsMatrixOut};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One segment column of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixColumn {
    pub item_id: i64,
    pub key: CellKey,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixGroup {
    pub template_id: i64,
    pub template_name: String,
    pub columns: Vec<MatrixColumn>,
    /// Active items whose bounds do not form an interval
    pub invalid_items: Vec<i64>,
    pub zones: Vec<Zone>,
}

impl MatrixGroup {
    pub fn keys(&self) -> Vec<CellKey> {
        self.columns.iter().map(|c| c.key).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneMatrix {
    pub groups: Vec<MatrixGroup>,
    pub unbound_zones: Vec<Zone>,
    /// Inactive or archived zones left out of the projection
    pub excluded_zones: usize,
}

impl ZoneMatrix {
    pub fn group_of(&self, zone_id: i64) -> Option<&MatrixGroup> {
        self.groups
            .iter()
            .find(|g| g.zones.iter().any(|z| z.id == zone_id))
    }

    pub fn zone(&self, zone_id: i64) -> Option<&Zone> {
        self.groups
            .iter()
            .flat_map(|g| g.zones.iter())
            .chain(self.unbound_zones.iter())
            .find(|z| z.id == zone_id)
    }

    pub fn zone_count(&self) -> usize {
        self.groups.iter().map(|g| g.zones.len()).sum::<usize>() + self.unbound_zones.len()
    }
}

fn columns_of(items: &[&TemplateItem]) -> (Vec<MatrixColumn>, Vec<i64>) {
    let mut columns = Vec::new();
    let mut invalid = Vec::new();
    for item in items.iter().filter(|i| i.active) {
        match item.segment().as_ref().and_then(key_from_weight_segment) {
            Some(key) => columns.push(MatrixColumn {
                item_id: item.id,
                key,
                label: segment_label(&key.segment()),
            }),
            None => invalid.push(item.id),
        }
    }
    (columns, invalid)
}

fn sorted(items: &[TemplateItem]) -> Vec<&TemplateItem> {
    let mut items: Vec<&TemplateItem> = items.iter().collect();
    items.sort_by_key(|i| (i.ord, i.id));
    items
}

/// Group live zones by their bound template
pub fn build_matrix(zones: &[Zone], templates: &[SegmentTemplate]) -> ZoneMatrix {
    let by_id: HashMap<i64, &SegmentTemplate> = templates.iter().map(|t| (t.id, t)).collect();
    let mut groups: BTreeMap<i64, MatrixGroup> = BTreeMap::new();
    let mut matrix = ZoneMatrix::default();

    for zone in zones {
        if !zone.is_live() {
            matrix.excluded_zones += 1;
            continue;
        }
        let template = zone.segment_template_id.and_then(|id| by_id.get(&id));
        let Some(template) = template else {
            matrix.unbound_zones.push(zone.clone());
            continue;
        };
        groups
            .entry(template.id)
            .or_insert_with(|| {
                let (columns, invalid_items) = columns_of(&sorted(&template.items));
                MatrixGroup {
                    template_id: template.id,
                    template_name: template.name.clone(),
                    columns,
                    invalid_items,
                    zones: Vec::new(),
                }
            })
            .zones
            .push(zone.clone());
    }

    matrix.groups = groups.into_values().collect();
    matrix
}

/// Projection of the backend's pre-grouped matrix response
pub fn matrix_from_wire(out: &ZoneBracketsMatrixOut) -> ZoneMatrix {
    let mut matrix = ZoneMatrix::default();
    for group in &out.groups {
        let (columns, invalid_items) = columns_of(&sorted(&group.segments));
        let mut zones = Vec::new();
        for zone in &group.zones {
            if zone.is_live() {
                zones.push(zone.clone());
            } else {
                matrix.excluded_zones += 1;
            }
        }
        matrix.groups.push(MatrixGroup {
            template_id: group.segment_template_id,
            template_name: group.template_name.clone(),
            columns,
            invalid_items,
            zones,
        });
    }
    for zone in &out.unbound_zones {
        if zone.is_live() {
            matrix.unbound_zones.push(zone.clone());
        } else {
            matrix.excluded_zones += 1;
        }
    }
    matrix
}

/// How a zone's backend brackets line up with its template columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiagnostics {
    /// Brackets whose bounds produce no key
    pub invalid: Vec<i64>,
    /// Keys present on brackets but not among the columns
    pub orphan: Vec<CellKey>,
    /// Columns with no bracket
    pub missing: Vec<CellKey>,
}

impl KeyDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.orphan.is_empty() && self.missing.is_empty()
    }

    /// Saving a zone is refused while any bracket key is invalid
    pub fn blocks_save(&self) -> bool {
        !self.invalid.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "invalid {} / orphan {} / missing {}",
            self.invalid.len(),
            self.orphan.len(),
            self.missing.len()
        )
    }
}

pub fn diagnose_zone_keys(columns: &[CellKey], brackets: &[Bracket]) -> KeyDiagnostics {
    let expected: BTreeSet<CellKey> = columns.iter().copied().collect();
    let mut present = BTreeSet::new();
    let mut diagnostics = KeyDiagnostics::default();

    for bracket in brackets {
        match key_from_bracket(bracket) {
            BracketKey::Cell(key) => {
                present.insert(key);
            }
            BracketKey::Invalid { bracket_id } => diagnostics.invalid.push(bracket_id),
        }
    }
    diagnostics.orphan = present.difference(&expected).copied().collect();
    diagnostics.missing = expected.difference(&present).copied().collect();
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::LenientDecimal;
    use shared::models::{MatrixGroupOut, PricingRule, TemplateStatus};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: i64, ord: i32, min: &str, max: Option<&str>, active: bool) -> TemplateItem {
        TemplateItem {
            id,
            ord,
            min_kg: d(min).into(),
            max_kg: max.map(|m| d(m).into()),
            active,
        }
    }

    fn template(id: i64, items: Vec<TemplateItem>) -> SegmentTemplate {
        SegmentTemplate {
            id,
            scheme_id: 1,
            name: format!("t{id}"),
            status: TemplateStatus::Published,
            is_active: true,
            items,
        }
    }

    fn zone(id: i64, template: Option<i64>, active: bool, archived: bool) -> Zone {
        Zone {
            id,
            scheme_id: 1,
            name: format!("z{id}"),
            active,
            archived_at: archived.then(|| "2026-01-01".to_string()),
            segment_template_id: template,
            members: vec![],
            brackets: None,
        }
    }

    #[test]
    fn test_groups_and_unbound() {
        let templates = vec![
            template(
                10,
                vec![
                    item(2, 2, "1", None, true),
                    item(1, 1, "0", Some("1"), true),
                    item(3, 3, "5", Some("9"), false),
                ],
            ),
            template(11, vec![item(4, 1, "0", None, true)]),
        ];
        let zones = vec![
            zone(1, Some(10), true, false),
            zone(2, Some(11), true, false),
            zone(3, Some(10), false, false),
            zone(4, Some(10), true, true),
            zone(5, None, true, false),
            zone(6, Some(99), true, false),
        ];

        let m = build_matrix(&zones, &templates);
        assert_eq!(m.groups.len(), 2);
        assert_eq!(m.excluded_zones, 2);
        assert_eq!(
            m.unbound_zones.iter().map(|z| z.id).collect::<Vec<_>>(),
            vec![5, 6]
        );

        let g = &m.groups[0];
        assert_eq!(g.template_id, 10);
        assert_eq!(
            g.columns.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
            vec!["0<w≤1", "w>1"]
        );
        assert_eq!(m.group_of(2).map(|g| g.template_id), Some(11));
        assert_eq!(m.zone_count(), 4);
    }

    #[test]
    fn test_invalid_item_is_reported() {
        let mut broken = item(7, 1, "0", Some("1"), true);
        broken.max_kg = Some(LenientDecimal::Invalid("x".to_string()));
        let m = build_matrix(&[zone(1, Some(10), true, false)], &[template(10, vec![broken])]);
        assert_eq!(m.groups[0].invalid_items, vec![7]);
        assert!(m.groups[0].columns.is_empty());
    }

    #[test]
    fn test_from_wire_skips_dead_zones() {
        let out = ZoneBracketsMatrixOut {
            groups: vec![MatrixGroupOut {
                segment_template_id: 10,
                template_name: "std".to_string(),
                segments: vec![item(1, 1, "0", None, true)],
                zones: vec![zone(1, Some(10), true, false), zone(2, Some(10), false, false)],
            }],
            unbound_zones: vec![zone(3, None, true, false)],
        };
        let m = matrix_from_wire(&out);
        assert_eq!(m.groups[0].zones.len(), 1);
        assert_eq!(m.excluded_zones, 1);
        assert_eq!(m.unbound_zones.len(), 1);
    }

    #[test]
    fn test_key_diagnostics() {
        let k1 = CellKey::new(d("0"), Some(d("1"))).unwrap();
        let k2 = CellKey::new(d("1"), None).unwrap();
        let rule = PricingRule::ManualQuote;
        let mut bad = Bracket::from_rule(3, 1, d("0"), None, &rule, true);
        bad.min_kg = LenientDecimal::Invalid("?".to_string());
        let brackets = vec![
            Bracket::from_rule(1, 1, d("0"), Some(d("1")), &rule, true),
            Bracket::from_rule(2, 1, d("1"), Some(d("3")), &rule, true),
            bad,
        ];

        let diag = diagnose_zone_keys(&[k1, k2], &brackets);
        assert_eq!(diag.invalid, vec![3]);
        assert_eq!(diag.orphan, vec![CellKey::new(d("1"), Some(d("3"))).unwrap()]);
        assert_eq!(diag.missing, vec![k2]);
        assert!(diag.blocks_save());
        assert_eq!(diag.summary(), "invalid 1 / orphan 1 / missing 1");
    }
}
