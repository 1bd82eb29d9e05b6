//! 测试夹具 - 方案、区域、重量段模板
#![allow(dead_code)]

use rate_client::InMemoryRateApi;
use rate_engine::{CellKey, EngineConfig, PricingWorkbench};
use rust_decimal::Decimal;
use shared::models::{
    AdjustmentScope, Bracket, DestAdjustment, PricingMode, PricingRule, PricingSchemeDetail,
    SegmentTemplate, TemplateItem, TemplateStatus, Zone, ZoneMember,
};
use std::str::FromStr;
use std::sync::Arc;

pub const SCHEME_ID: i64 = 1;
pub const TEMPLATE_ID: i64 = 50;

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn key(min: &str, max: Option<&str>) -> CellKey {
    CellKey::new(d(min), max.map(d)).unwrap()
}

pub fn flat(id: i64, zone_id: i64, min: &str, max: Option<&str>, amount: &str) -> Bracket {
    Bracket::from_rule(
        id,
        zone_id,
        d(min),
        max.map(d),
        &PricingRule::Flat {
            flat_amount: d(amount),
        },
        true,
    )
}

pub fn zone(id: i64, name: &str, province: &str, brackets: Vec<Bracket>) -> Zone {
    Zone {
        id,
        scheme_id: SCHEME_ID,
        name: name.to_string(),
        active: true,
        archived_at: None,
        segment_template_id: Some(TEMPLATE_ID),
        members: vec![ZoneMember::province(province)],
        brackets: Some(brackets),
    }
}

fn item(id: i64, ord: i32, min: &str, max: Option<&str>) -> TemplateItem {
    TemplateItem {
        id,
        ord,
        min_kg: d(min).into(),
        max_kg: max.map(|m| d(m).into()),
        active: true,
    }
}

/// Published template `[0,1] (1,2] (2,∞)`
pub fn template() -> SegmentTemplate {
    SegmentTemplate {
        id: TEMPLATE_ID,
        scheme_id: SCHEME_ID,
        name: "standard".to_string(),
        status: TemplateStatus::Published,
        is_active: true,
        items: vec![
            item(51, 1, "0", Some("1")),
            item(52, 2, "1", Some("2")),
            item(53, 3, "2", None),
        ],
    }
}

pub fn scheme(mode: PricingMode, zones: Vec<Zone>, adjustments: Vec<DestAdjustment>) -> PricingSchemeDetail {
    PricingSchemeDetail {
        id: SCHEME_ID,
        shipping_provider_id: 1,
        name: "express".to_string(),
        active: true,
        archived_at: None,
        currency: "CNY".to_string(),
        default_pricing_mode: Some(mode),
        billable_weight_rule: None,
        default_segment_template_id: Some(TEMPLATE_ID),
        zones,
        surcharges: vec![],
        dest_adjustments: adjustments,
    }
}

pub fn adjustment(
    id: i64,
    scope: AdjustmentScope,
    city: Option<&str>,
    amount: &str,
    active: bool,
) -> DestAdjustment {
    DestAdjustment {
        id,
        scheme_id: SCHEME_ID,
        scope,
        province_code: "330000".to_string(),
        city_code: city.map(str::to_string),
        province_name: Some("浙江省".to_string()),
        city_name: None,
        amount: d(amount),
        active,
        priority: 100,
    }
}

/// Backend seeded with `scheme` and the standard template
pub fn backend(scheme: PricingSchemeDetail) -> Arc<InMemoryRateApi> {
    let api = InMemoryRateApi::new();
    api.seed_template(template());
    api.seed_scheme(scheme);
    Arc::new(api)
}

pub async fn open(api: &Arc<InMemoryRateApi>) -> PricingWorkbench<InMemoryRateApi> {
    PricingWorkbench::open(api.clone(), SCHEME_ID, EngineConfig::default())
        .await
        .unwrap()
}
