// rate-client/tests/memory_backend.rs
// 内存后端集成测试

use rate_client::{InMemoryRateApi, RateApi};
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::models::{
    ActivePolicy, AdjustmentScope, Bracket, BracketCreate, ConflictPolicy, CopyBracketsRequest,
    DestAdjustment, DestAdjustmentUpdate, DestAdjustmentUpsert, PricingMode, PricingRule,
    PricingSchemeDetail, Zone, ZoneCreateAtomic, ZoneMember,
};
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn flat(id: i64, zone_id: i64, min: &str, max: Option<&str>, amount: &str) -> Bracket {
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

fn make_zone(id: i64, name: &str, province: &str, brackets: Vec<Bracket>) -> Zone {
    Zone {
        id,
        scheme_id: 1,
        name: name.to_string(),
        active: true,
        archived_at: None,
        segment_template_id: Some(50),
        members: vec![ZoneMember::province(province)],
        brackets: Some(brackets),
    }
}

fn make_scheme(zones: Vec<Zone>, adjustments: Vec<DestAdjustment>) -> PricingSchemeDetail {
    PricingSchemeDetail {
        id: 1,
        shipping_provider_id: 1,
        name: "express".to_string(),
        active: true,
        archived_at: None,
        currency: "CNY".to_string(),
        default_pricing_mode: Some(PricingMode::Flat),
        billable_weight_rule: None,
        default_segment_template_id: None,
        zones,
        surcharges: vec![],
        dest_adjustments: adjustments,
    }
}

fn adjustment(id: i64, scope: AdjustmentScope, city: Option<&str>, active: bool) -> DestAdjustment {
    DestAdjustment {
        id,
        scheme_id: 1,
        scope,
        province_code: "330000".to_string(),
        city_code: city.map(str::to_string),
        province_name: Some("浙江省".to_string()),
        city_name: None,
        amount: d("1"),
        active,
        priority: 100,
    }
}

fn copy_request(source: i64, policy: ConflictPolicy) -> CopyBracketsRequest {
    CopyBracketsRequest {
        source_zone_id: source,
        conflict_policy: policy,
        active_policy: ActivePolicy::ForceActive,
        include_inactive: false,
        pricing_modes: None,
    }
}

#[tokio::test]
async fn test_create_bracket_upserts_by_interval() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![make_zone(5, "east", "浙江省", vec![flat(10, 5, "1", Some("2"), "8")])],
        vec![],
    ));

    let payload = BracketCreate {
        min_kg: d("1.0"),
        max_kg: Some(d("2.00")),
        rule: PricingRule::Flat {
            flat_amount: d("9"),
        },
        active: true,
    };
    let saved = api.create_bracket(5, &payload).await.unwrap();

    assert_eq!(saved.id, 10);
    assert_eq!(saved.flat_amount.unwrap().value(), Some(d("9")));
    assert_eq!(api.brackets_of(5).len(), 1);
}

#[tokio::test]
async fn test_copy_skip_and_overwrite() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![
            make_zone(
                1,
                "a",
                "浙江省",
                vec![
                    flat(10, 1, "0", Some("1"), "5"),
                    flat(11, 1, "1", None, "9"),
                ],
            ),
            make_zone(2, "b", "江苏省", vec![flat(20, 2, "0", Some("1"), "6")]),
        ],
        vec![],
    ));

    let skipped = api
        .copy_brackets(2, &copy_request(1, ConflictPolicy::Skip))
        .await
        .unwrap();
    assert_eq!(skipped.summary.created_count, 1);
    assert_eq!(skipped.summary.skipped_count, 1);

    let overwritten = api
        .copy_brackets(2, &copy_request(1, ConflictPolicy::Overwrite))
        .await
        .unwrap();
    assert_eq!(overwritten.summary.updated_count, 2);
    assert_eq!(overwritten.summary.created_count, 0);

    let first = api.brackets_of(2).into_iter().find(|b| b.id == 20).unwrap();
    assert_eq!(first.flat_amount.unwrap().value(), Some(d("5")));
}

#[tokio::test]
async fn test_copy_into_itself_is_rejected() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(vec![make_zone(1, "a", "浙江省", vec![])], vec![]));

    let err = api
        .copy_brackets(1, &copy_request(1, ConflictPolicy::Skip))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_delete_referenced_bracket_is_restricted() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![make_zone(5, "east", "浙江省", vec![flat(10, 5, "0", Some("1"), "8")])],
        vec![],
    ));
    api.mark_referenced(10);

    let err = api.delete_bracket(10).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("foreign key"));
    assert_eq!(api.brackets_of(5).len(), 1);
}

#[tokio::test]
async fn test_scope_conflict_names_both_ids() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![],
        vec![
            adjustment(31, AdjustmentScope::Province, None, true),
            adjustment(32, AdjustmentScope::City, Some("330100"), false),
        ],
    ));

    let payload = DestAdjustmentUpsert {
        scope: AdjustmentScope::City,
        province_code: "330000".to_string(),
        city_code: Some("330100".to_string()),
        province_name: None,
        city_name: None,
        amount: d("2"),
        active: true,
        priority: 100,
    };
    let err = api.upsert_dest_adjustment(1, &payload).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.detail_code(), Some("dest_adjustment_scope_conflict"));
    let mut ids = err.conflict_ids();
    ids.sort();
    assert_eq!(ids, vec![31, 32]);
    assert!(!api.adjustment(32).unwrap().active);
}

#[tokio::test]
async fn test_reactivation_checks_scope_conflict() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![],
        vec![
            adjustment(31, AdjustmentScope::Province, None, true),
            adjustment(32, AdjustmentScope::City, Some("330100"), false),
        ],
    ));

    let patch = DestAdjustmentUpdate {
        active: Some(true),
        ..Default::default()
    };
    let err = api.patch_dest_adjustment(32, &patch).await.unwrap_err();
    assert_eq!(err.conflict_ids(), vec![32, 31]);
}

#[tokio::test]
async fn test_zone_creation_respects_province_occupancy() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(vec![make_zone(5, "east", "浙江省", vec![])], vec![]));

    let payload = ZoneCreateAtomic {
        name: "dup".to_string(),
        active: true,
        segment_template_id: None,
        provinces: vec!["浙江省".to_string(), "上海市".to_string()],
    };
    let err = api.create_zone_atomic(1, &payload).await.unwrap_err();
    match err {
        rate_client::ClientError::Api { code, .. } => {
            assert_eq!(code, Some(ErrorCode::ProvinceOccupied))
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_zone_payload_omits_brackets() {
    let api = InMemoryRateApi::new();
    api.seed_scheme(make_scheme(
        vec![make_zone(7, "far", "新疆", vec![flat(70, 7, "0", Some("1"), "20")])],
        vec![],
    ));
    api.omit_brackets_for(7);

    let matrix = api.zone_brackets_matrix(1).await.unwrap();
    let zone = matrix.all_zones().find(|z| z.id == 7).unwrap();
    assert!(zone.brackets.is_none());
    assert_eq!(api.calls(), 1);
}
