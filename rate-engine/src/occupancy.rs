//! Province occupancy across live zones

use shared::models::{MemberLevel, Zone};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub zone_id: i64,
    pub zone_name: String,
}

/// Province → live zone holding it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvinceOccupancy {
    by_province: BTreeMap<String, Occupant>,
}

impl ProvinceOccupancy {
    pub fn occupant(&self, province: &str) -> Option<&Occupant> {
        self.by_province.get(province.trim())
    }

    pub fn is_taken(&self, province: &str) -> bool {
        self.occupant(province).is_some()
    }

    /// Requested provinces already held by another zone, in request order
    pub fn conflicts<'a>(&'a self, provinces: &'a [String]) -> Vec<(&'a str, &'a Occupant)> {
        provinces
            .iter()
            .filter_map(|p| self.occupant(p).map(|o| (p.as_str(), o)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_province.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_province.is_empty()
    }
}

/// Occupancy of active, non-archived zones; `editing_zone_id` does not count
pub fn build_province_occupancy(zones: &[Zone], editing_zone_id: Option<i64>) -> ProvinceOccupancy {
    let mut by_province = BTreeMap::new();
    for zone in zones {
        if !zone.is_live() || Some(zone.id) == editing_zone_id {
            continue;
        }
        for province in zone.member_values(MemberLevel::Province) {
            by_province
                .entry(province.trim().to_string())
                .or_insert_with(|| Occupant {
                    zone_id: zone.id,
                    zone_name: zone.name.clone(),
                });
        }
    }
    ProvinceOccupancy { by_province }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ZoneMember;

    fn zone(id: i64, active: bool, provinces: &[&str]) -> Zone {
        Zone {
            id,
            scheme_id: 1,
            name: format!("z{id}"),
            active,
            archived_at: None,
            segment_template_id: None,
            members: provinces.iter().map(|p| ZoneMember::province(*p)).collect(),
            brackets: None,
        }
    }

    #[test]
    fn test_only_live_zones_occupy() {
        let zones = vec![zone(1, true, &["浙江省", "上海市"]), zone(2, false, &["江苏省"])];
        let occ = build_province_occupancy(&zones, None);
        assert_eq!(occ.len(), 2);
        assert_eq!(occ.occupant("浙江省").map(|o| o.zone_id), Some(1));
        assert!(!occ.is_taken("江苏省"));
    }

    #[test]
    fn test_editing_zone_is_exempt() {
        let zones = vec![zone(1, true, &["浙江省"])];
        assert!(build_province_occupancy(&zones, Some(1)).is_empty());
    }

    #[test]
    fn test_conflicts_in_request_order() {
        let zones = vec![zone(1, true, &["浙江省", "上海市"])];
        let occ = build_province_occupancy(&zones, None);
        let wanted = vec!["上海市".to_string(), "安徽省".to_string(), "浙江省".to_string()];
        let hits: Vec<&str> = occ.conflicts(&wanted).into_iter().map(|(p, _)| p).collect();
        assert_eq!(hits, vec!["上海市", "浙江省"]);
    }
}
