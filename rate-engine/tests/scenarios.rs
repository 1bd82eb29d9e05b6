// rate-engine/tests/scenarios.rs
// 端到端场景：重量段、保存、复制、刷新、目的地调整冲突

mod common;

use common::*;
use rate_engine::copy::copy_to_targets;
use rate_engine::pricing::DraftError;
use rate_engine::segments::{SegmentDraft, SegmentError, validate_segments};
use rate_engine::{CopyOptions, EngineError, RowDraft};
use shared::models::{AdjustmentScope, DestAdjustmentUpsert, PricingMode};

#[test]
fn test_continuous_segments_pass_and_gap_fails() {
    let ok = [
        SegmentDraft::new("0", "1"),
        SegmentDraft::new("1", "2"),
        SegmentDraft::new("2", ""),
    ];
    assert_eq!(validate_segments(&ok), Ok(()));

    let gap = [SegmentDraft::new("0", "1"), SegmentDraft::new("2", "3")];
    let err = validate_segments(&gap).unwrap_err();
    assert!(matches!(err, SegmentError::Discontinuous { row: 2, .. }));
    assert!(err.to_string().contains("must equal previous max"));
}

#[tokio::test]
async fn test_flat_draft_saves_exact_bracket() {
    let api = backend(scheme(
        PricingMode::LinearTotal,
        vec![zone(5, "east", "浙江省", vec![])],
        vec![],
    ));
    let workbench = open(&api).await;
    let cell = key("1", Some("2"));

    workbench.set_draft(
        5,
        cell,
        RowDraft::Flat {
            amount: "8.00".to_string(),
        },
    );
    let saved = workbench.save_cell(5, cell).await.unwrap();

    assert_eq!(saved.pricing_mode, Some(PricingMode::Flat));
    assert_eq!(saved.flat_amount.as_ref().and_then(|v| v.value()), Some(d("8")));
    assert_eq!(saved.min_kg.value(), Some(d("1")));
    assert_eq!(saved.max_kg.as_ref().and_then(|v| v.value()), Some(d("2")));
    assert_eq!(api.brackets_of(5), vec![saved.clone()]);
    assert!(!workbench.cache().lock().is_dirty(5, &cell));
    assert!(!workbench.is_busy());
}

#[tokio::test]
async fn test_missing_rate_fails_without_network() {
    let api = backend(scheme(
        PricingMode::LinearTotal,
        vec![zone(5, "east", "浙江省", vec![])],
        vec![],
    ));
    let workbench = open(&api).await;
    let cell = key("0", Some("1"));
    workbench.set_draft(
        5,
        cell,
        RowDraft::LinearTotal {
            base_amount: "3".to_string(),
            rate_per_kg: "".to_string(),
        },
    );

    let before = api.calls();
    let err = workbench.save_cell(5, cell).await.unwrap_err();

    assert!(matches!(err, EngineError::Draft(DraftError::RatePerKgRequired)));
    assert!(err.is_validation());
    assert_eq!(err.user_message(), "rate per kg required");
    assert_eq!(api.calls(), before);
    assert!(api.brackets_of(5).is_empty());
}

#[tokio::test]
async fn test_copy_skip_counts_per_target() {
    let api = backend(scheme(
        PricingMode::Flat,
        vec![
            zone(
                1,
                "a",
                "浙江省",
                vec![flat(10, 1, "0", Some("1"), "5"), flat(11, 1, "1", Some("2"), "8")],
            ),
            zone(
                2,
                "b",
                "江苏省",
                vec![flat(20, 2, "0", Some("1"), "6"), flat(21, 2, "1", Some("2"), "9")],
            ),
            zone(3, "c", "上海市", vec![]),
        ],
        vec![],
    ));

    let report = copy_to_targets(api.as_ref(), 1, &[2, 3], &CopyOptions::default())
        .await
        .unwrap();

    assert_eq!(report.totals.created_count, 2);
    assert_eq!(report.totals.updated_count, 0);
    assert_eq!(report.totals.skipped_count, 2);
    assert_eq!(report.totals.failed_count, 0);
    assert!(report.all_succeeded());
    // skipped cells keep the target's own price
    assert_eq!(
        api.brackets_of(2)[0].flat_amount.as_ref().and_then(|v| v.value()),
        Some(d("6"))
    );
    assert_eq!(api.brackets_of(3).len(), 2);
}

#[tokio::test]
async fn test_refresh_without_brackets_keeps_cache() {
    let api = backend(scheme(
        PricingMode::Flat,
        vec![zone(7, "north", "北京市", vec![flat(70, 7, "0", Some("1"), "5")])],
        vec![],
    ));
    let workbench = open(&api).await;
    assert_eq!(workbench.cache().lock().brackets_of(7).len(), 1);

    api.omit_brackets_for(7);
    let merge = workbench.reload().await.unwrap().unwrap();

    assert_eq!(merge.zones_untouched, 1);
    let cache = workbench.cache();
    let cache = cache.lock();
    assert_eq!(cache.brackets_of(7).len(), 1);
    assert_eq!(cache.brackets_of(7)[0].id, 70);
    assert!(cache.draft(7, &key("0", Some("1"))).is_some());
}

#[tokio::test]
async fn test_province_and_city_scope_conflict() {
    let api = backend(scheme(
        PricingMode::Flat,
        vec![zone(5, "east", "浙江省", vec![])],
        vec![
            adjustment(31, AdjustmentScope::City, Some("330100"), "2", false),
            adjustment(32, AdjustmentScope::Province, None, "1", true),
        ],
    ));
    let workbench = open(&api).await;

    let payload = DestAdjustmentUpsert {
        scope: AdjustmentScope::City,
        province_code: "330000".to_string(),
        city_code: Some("330100".to_string()),
        province_name: Some("浙江省".to_string()),
        city_name: Some("杭州市".to_string()),
        amount: d("2"),
        active: true,
        priority: 100,
    };
    let err = workbench.upsert_dest_adjustment(&payload).await.unwrap_err();

    match &err {
        EngineError::Conflict { ids, code, .. } => {
            assert_eq!(ids, &vec![31, 32]);
            assert_eq!(code.as_deref(), Some("dest_adjustment_scope_conflict"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        err.user_message(),
        "conflicting active rule(s) #31, #32; deactivate them first"
    );
    assert!(!api.adjustment(31).unwrap().active);
}
