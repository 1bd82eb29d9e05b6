//! Zone ↔ Bracket Matrix wire model

use super::segment_template::TemplateItem;
use super::zone::Zone;
use serde::{Deserialize, Serialize};

/// One segment template with the zones bound to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixGroupOut {
    pub segment_template_id: i64,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub segments: Vec<TemplateItem>,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

/// `GET /pricing-schemes/{id}/zone-brackets-matrix`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneBracketsMatrixOut {
    #[serde(default)]
    pub groups: Vec<MatrixGroupOut>,
    #[serde(default)]
    pub unbound_zones: Vec<Zone>,
}

impl ZoneBracketsMatrixOut {
    /// Every zone in the payload, grouped or not
    pub fn all_zones(&self) -> impl Iterator<Item = &Zone> {
        self.groups
            .iter()
            .flat_map(|g| g.zones.iter())
            .chain(self.unbound_zones.iter())
    }
}
