//! Zone Model

use super::bracket::Bracket;
use super::default_true;
use serde::{Deserialize, Serialize};

/// Level of a zone member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberLevel {
    Province,
    City,
    District,
    #[serde(other)]
    Other,
}

/// A destination routed into a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub level: MemberLevel,
    pub value: String,
}

impl ZoneMember {
    pub fn province(value: impl Into<String>) -> Self {
        Self {
            id: None,
            level: MemberLevel::Province,
            value: value.into(),
        }
    }

    pub fn city(value: impl Into<String>) -> Self {
        Self {
            id: None,
            level: MemberLevel::City,
            value: value.into(),
        }
    }
}

/// Destination zone of a pricing scheme (目的地区域)
///
/// `brackets` distinguishes "not reported" (`None`, field absent or null)
/// from "reported empty" (`Some(vec![])`). Only the latter may clear a
/// cached bracket list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub scheme_id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub archived_at: Option<String>,
    #[serde(default)]
    pub segment_template_id: Option<i64>,
    #[serde(default)]
    pub members: Vec<ZoneMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brackets: Option<Vec<Bracket>>,
}

impl Zone {
    /// Active and not archived
    pub fn is_live(&self) -> bool {
        self.active && self.archived_at.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Member values at the given level
    pub fn member_values(&self, level: MemberLevel) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(move |m| m.level == level)
            .map(|m| m.value.as_str())
    }
}

/// Atomic zone creation payload (`POST /pricing-schemes/{id}/zones-atomic`)
///
/// Zone and its province members are written in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCreateAtomic {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub segment_template_id: Option<i64>,
    pub provinces: Vec<String>,
}

/// Update zone payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_template_id: Option<i64>,
}

/// Replace province members payload (`PUT /zones/{id}/province-members`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceMembersPut {
    pub provinces: Vec<String>,
}
