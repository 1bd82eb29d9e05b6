//! Quote computation
//!
//! total = bracket price + destination adjustment + matching surcharges.
//! Every amount is rounded to 2 dp half away from zero; a manual-quote cell
//! is an error, never a zero price.

use crate::keys::{CellKey, key_from_bracket, key_from_weight_segment};
use crate::pricing::{
    CellPrice, compute_price, draft_from_bracket, round_money, validate_draft_for_save,
};
use crate::segments::segment_label;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::ErrorCode;
use shared::models::{
    AdjustmentScope, BillableWeightRule, Bracket, DestAdjustment, MemberLevel, PricingMode,
    PricingSchemeDetail, RoundingMode, SegmentTemplate, Surcharge, SurchargeAmount, Zone,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("weight must be a number > 0")]
    InvalidWeight,

    #[error("no active zone covers {0}")]
    NoZone(String),

    #[error("zone {zone_id} has no usable segment template")]
    TemplateNotBound { zone_id: i64 },

    #[error("weight {weight}kg falls outside every segment of zone {zone_id}")]
    NoSegment { zone_id: i64, weight: Decimal },

    #[error("zone {zone_id} has no active price for {segment}")]
    NoBracket { zone_id: i64, segment: String },

    #[error("zone {zone_id} {segment} requires a manual quote")]
    ManualQuote { zone_id: i64, segment: String },

    #[error("bracket {bracket_id} has incomplete pricing fields")]
    IncompleteBracket { bracket_id: i64 },
}

impl QuoteError {
    pub fn code(&self) -> ErrorCode {
        match self {
            QuoteError::InvalidWeight | QuoteError::NoSegment { .. } => ErrorCode::ValueOutOfRange,
            QuoteError::NoZone(_) => ErrorCode::ZoneNotFound,
            QuoteError::TemplateNotBound { .. } => ErrorCode::TemplateNotBound,
            QuoteError::NoBracket { .. } => ErrorCode::BracketNotFound,
            QuoteError::ManualQuote { .. } => ErrorCode::ManualQuoteRequired,
            QuoteError::IncompleteBracket { .. } => ErrorCode::BracketKeyInvalid,
        }
    }
}

/// Dimensions in centimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteRequest {
    pub weight_kg: Decimal,
    pub dimensions: Option<Dimensions>,
    pub province: String,
    pub city: Option<String>,
    pub district: Option<String>,
    /// Order flags such as `bulky`
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub id: i64,
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteBreakdown {
    pub zone_id: i64,
    pub zone_name: String,
    pub billable_weight: Decimal,
    pub segment: String,
    pub bracket_id: i64,
    pub base: Decimal,
    pub adjustment: Option<QuoteLine>,
    pub surcharges: Vec<QuoteLine>,
    pub total: Decimal,
}

/// max(real, volumetric) then rounded up to the configured step
///
/// Dimensions or steps that push the arithmetic out of decimal range are
/// refused as an invalid weight.
pub fn billable_weight(
    rule: Option<&BillableWeightRule>,
    weight: Decimal,
    dimensions: Option<&Dimensions>,
) -> Result<Decimal, QuoteError> {
    let Some(rule) = rule else {
        return Ok(weight);
    };
    let mut billable = weight;
    if let (Some(divisor), Some(dims)) = (rule.volume_divisor, dimensions)
        && divisor > Decimal::ZERO
    {
        let volumetric = dims
            .length
            .checked_mul(dims.width)
            .and_then(|v| v.checked_mul(dims.height))
            .and_then(|v| v.checked_div(divisor))
            .ok_or(QuoteError::InvalidWeight)?;
        billable = billable.max(volumetric);
    }
    if let Some(rounding) = &rule.rounding
        && rounding.mode == RoundingMode::Ceil
        && rounding.step_kg > Decimal::ZERO
    {
        billable = billable
            .checked_div(rounding.step_kg)
            .and_then(|steps| steps.ceil().checked_mul(rounding.step_kg))
            .ok_or(QuoteError::InvalidWeight)?;
    }
    Ok(billable.normalize())
}

/// Live zone for a destination; a city member beats a province member
pub fn resolve_zone<'a>(zones: &'a [Zone], province: &str, city: Option<&str>) -> Option<&'a Zone> {
    let live = || zones.iter().filter(|z| z.is_live());
    if let Some(city) = city
        && let Some(zone) = live().find(|z| z.member_values(MemberLevel::City).any(|v| v == city))
    {
        return Some(zone);
    }
    live().find(|z| {
        z.member_values(MemberLevel::Province)
            .any(|v| v == province)
    })
}

fn adjustment_for<'a>(
    adjustments: &'a [DestAdjustment],
    province: &str,
    city: Option<&str>,
) -> Option<&'a DestAdjustment> {
    let best = |scope: AdjustmentScope| {
        adjustments
            .iter()
            .filter(|a| a.active && a.scope == scope && a.matches_province(province))
            .filter(|a| scope == AdjustmentScope::Province || city.is_some_and(|c| a.matches_city(c)))
            .max_by_key(|a| (a.priority, -a.id))
    };
    best(AdjustmentScope::City).or_else(|| best(AdjustmentScope::Province))
}

fn surcharge_applies(surcharge: &Surcharge, request: &QuoteRequest) -> bool {
    let condition = &surcharge.condition_json;
    if let Some(dest) = &condition.dest {
        let hit = |list: &[String], value: Option<&str>| {
            list.is_empty() || value.is_some_and(|v| list.iter().any(|x| x == v))
        };
        if !hit(&dest.province, Some(request.province.as_str()))
            || !hit(&dest.city, request.city.as_deref())
            || !hit(&dest.district, request.district.as_deref())
        {
            return false;
        }
    }
    condition.flag_any.is_empty() || condition.flag_any.iter().any(|f| request.flags.contains(f))
}

fn cell_bracket<'a>(zone: &'a Zone, key: &CellKey) -> Option<&'a Bracket> {
    zone.brackets
        .as_deref()?
        .iter()
        .filter(|b| b.active)
        .filter(|b| key_from_bracket(b).cell().as_ref() == Some(key))
        .max_by_key(|b| b.id)
}

/// Price an order against a scheme and its segment templates
pub fn compute_quote(
    scheme: &PricingSchemeDetail,
    templates: &[SegmentTemplate],
    request: &QuoteRequest,
) -> Result<QuoteBreakdown, QuoteError> {
    if request.weight_kg <= Decimal::ZERO {
        return Err(QuoteError::InvalidWeight);
    }
    let weight = billable_weight(
        scheme.billable_weight_rule.as_ref(),
        request.weight_kg,
        request.dimensions.as_ref(),
    )?;

    let zone = resolve_zone(&scheme.zones, &request.province, request.city.as_deref())
        .ok_or_else(|| QuoteError::NoZone(request.province.clone()))?;

    let template = zone
        .segment_template_id
        .and_then(|id| templates.iter().find(|t| t.id == id))
        .ok_or(QuoteError::TemplateNotBound { zone_id: zone.id })?;

    let segment = template
        .sorted_items()
        .into_iter()
        .filter(|i| i.active)
        .filter_map(|i| i.segment())
        .enumerate()
        .find(|(i, s)| s.contains(weight, *i == 0))
        .map(|(_, s)| s)
        .ok_or(QuoteError::NoSegment {
            zone_id: zone.id,
            weight,
        })?;
    let label = segment_label(&segment);
    let key = key_from_weight_segment(&segment).ok_or(QuoteError::NoSegment {
        zone_id: zone.id,
        weight,
    })?;

    let bracket = cell_bracket(zone, &key).ok_or_else(|| QuoteError::NoBracket {
        zone_id: zone.id,
        segment: label.clone(),
    })?;
    let draft = draft_from_bracket(bracket, PricingMode::ManualQuote);
    let rule = validate_draft_for_save(Some(&draft), PricingMode::ManualQuote)
        .map_err(|_| QuoteError::IncompleteBracket {
            bracket_id: bracket.id,
        })?;
    let base = match compute_price(&rule, weight) {
        CellPrice::Computed(v) => v,
        CellPrice::OutOfRange => return Err(QuoteError::InvalidWeight),
        CellPrice::ManualQuote => {
            return Err(QuoteError::ManualQuote {
                zone_id: zone.id,
                segment: label,
            });
        }
    };

    let adjustment = adjustment_for(
        &scheme.dest_adjustments,
        &request.province,
        request.city.as_deref(),
    )
    .map(|a| QuoteLine {
        id: a.id,
        label: a.label(),
        amount: round_money(a.amount),
    });

    let mut matching: Vec<&Surcharge> = scheme
        .surcharges
        .iter()
        .filter(|s| s.active && surcharge_applies(s, request))
        .collect();
    matching.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    let mut surcharges = Vec::new();
    for s in matching {
        let amount = match &s.amount_json {
            SurchargeAmount::Flat { amount } => *amount,
            SurchargeAmount::PerKg { rate_per_kg } => rate_per_kg
                .checked_mul(weight)
                .ok_or(QuoteError::InvalidWeight)?,
            SurchargeAmount::Unsupported => {
                tracing::warn!(surcharge_id = s.id, "Skipping surcharge with unsupported amount kind");
                continue;
            }
        };
        surcharges.push(QuoteLine {
            id: s.id,
            label: s.name.clone(),
            amount: round_money(amount),
        });
    }

    let total = adjustment
        .iter()
        .map(|a| a.amount)
        .chain(surcharges.iter().map(|s| s.amount))
        .try_fold(base, |acc, v| acc.checked_add(v))
        .map(round_money)
        .ok_or(QuoteError::InvalidWeight)?;

    Ok(QuoteBreakdown {
        zone_id: zone.id,
        zone_name: zone.name.clone(),
        billable_weight: weight,
        segment: label,
        bracket_id: bracket.id,
        base,
        adjustment,
        surcharges,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        DestCondition, PricingRule, SurchargeCondition, TemplateItem, TemplateStatus,
        WeightRounding, ZoneMember,
    };
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: i64, min: &str, max: Option<&str>) -> TemplateItem {
        TemplateItem {
            id,
            ord: id as i32,
            min_kg: d(min).into(),
            max_kg: max.map(|m| d(m).into()),
            active: true,
        }
    }

    fn fixture() -> (PricingSchemeDetail, Vec<SegmentTemplate>) {
        let template = SegmentTemplate {
            id: 50,
            scheme_id: 1,
            name: "std".to_string(),
            status: TemplateStatus::Published,
            is_active: true,
            items: vec![item(1, "0", Some("1")), item(2, "1", None)],
        };
        let zone = Zone {
            id: 5,
            scheme_id: 1,
            name: "east".to_string(),
            active: true,
            archived_at: None,
            segment_template_id: Some(50),
            members: vec![ZoneMember::province("浙江省"), ZoneMember::city("上海市")],
            brackets: Some(vec![
                Bracket::from_rule(
                    10,
                    5,
                    d("0"),
                    Some(d("1")),
                    &PricingRule::Flat {
                        flat_amount: d("8"),
                    },
                    true,
                ),
                Bracket::from_rule(
                    11,
                    5,
                    d("1"),
                    None,
                    &PricingRule::StepOver {
                        base_kg: d("1"),
                        base_amount: d("8"),
                        rate_per_kg: d("2.5"),
                    },
                    true,
                ),
            ]),
        };
        let scheme = PricingSchemeDetail {
            id: 1,
            shipping_provider_id: 1,
            name: "express".to_string(),
            active: true,
            archived_at: None,
            currency: "CNY".to_string(),
            default_pricing_mode: Some(PricingMode::Flat),
            billable_weight_rule: None,
            default_segment_template_id: Some(50),
            zones: vec![zone],
            surcharges: vec![],
            dest_adjustments: vec![],
        };
        (scheme, vec![template])
    }

    fn request(weight: &str) -> QuoteRequest {
        QuoteRequest {
            weight_kg: d(weight),
            province: "浙江省".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_segment_is_closed_at_zero() {
        let (scheme, templates) = fixture();
        let q = compute_quote(&scheme, &templates, &request("1")).unwrap();
        assert_eq!(q.bracket_id, 10);
        assert_eq!(q.segment, "0<w≤1");
        assert_eq!(q.total, d("8"));
    }

    #[test]
    fn test_step_over_quote() {
        let (scheme, templates) = fixture();
        let q = compute_quote(&scheme, &templates, &request("3")).unwrap();
        assert_eq!(q.bracket_id, 11);
        assert_eq!(q.total, d("13"));
    }

    #[test]
    fn test_manual_quote_is_an_error() {
        let (mut scheme, templates) = fixture();
        let zone = &mut scheme.zones[0];
        zone.brackets.as_mut().unwrap()[1].apply_rule(&PricingRule::ManualQuote);
        let err = compute_quote(&scheme, &templates, &request("3")).unwrap_err();
        assert!(matches!(err, QuoteError::ManualQuote { zone_id: 5, .. }));
        assert_eq!(err.code(), ErrorCode::ManualQuoteRequired);
    }

    #[test]
    fn test_unknown_destination() {
        let (scheme, templates) = fixture();
        let mut req = request("1");
        req.province = "西藏".to_string();
        assert_eq!(
            compute_quote(&scheme, &templates, &req),
            Err(QuoteError::NoZone("西藏".to_string()))
        );
    }

    #[test]
    fn test_billable_weight_volume_and_step() {
        let rule = BillableWeightRule {
            volume_divisor: Some(d("6000")),
            rounding: Some(WeightRounding {
                mode: RoundingMode::Ceil,
                step_kg: d("0.5"),
            }),
        };
        let dims = Dimensions {
            length: d("40"),
            width: d("30"),
            height: d("20"),
        };
        assert_eq!(billable_weight(Some(&rule), d("1.2"), Some(&dims)), Ok(d("4")));
        assert_eq!(billable_weight(Some(&rule), d("1.2"), None), Ok(d("1.5")));
        assert_eq!(billable_weight(None, d("1.2"), Some(&dims)), Ok(d("1.2")));
    }

    #[test]
    fn test_oversized_dimensions_are_refused() {
        let rule = BillableWeightRule {
            volume_divisor: Some(d("6000")),
            rounding: None,
        };
        let dims = Dimensions {
            length: Decimal::MAX,
            width: Decimal::MAX,
            height: d("1"),
        };
        assert_eq!(
            billable_weight(Some(&rule), d("1"), Some(&dims)),
            Err(QuoteError::InvalidWeight)
        );
    }

    #[test]
    fn test_city_adjustment_before_province() {
        let (mut scheme, templates) = fixture();
        let adj = |id: i64, scope: AdjustmentScope, city: Option<&str>, amount: &str| DestAdjustment {
            id,
            scheme_id: 1,
            scope,
            province_code: "浙江省".to_string(),
            city_code: city.map(str::to_string),
            province_name: None,
            city_name: None,
            amount: d(amount),
            active: true,
            priority: 100,
        };
        scheme.dest_adjustments = vec![
            adj(1, AdjustmentScope::Province, None, "1"),
            adj(2, AdjustmentScope::City, Some("杭州市"), "3"),
        ];

        let province_only = compute_quote(&scheme, &templates, &request("1")).unwrap();
        assert_eq!(province_only.adjustment.as_ref().map(|a| a.id), Some(1));
        assert_eq!(province_only.total, d("9"));

        let mut req = request("1");
        req.city = Some("杭州市".to_string());
        let city = compute_quote(&scheme, &templates, &req).unwrap();
        assert_eq!(city.adjustment.as_ref().map(|a| a.id), Some(2));
        assert_eq!(city.total, d("11"));
    }

    #[test]
    fn test_surcharges_match_flags_and_destination() {
        let (mut scheme, templates) = fixture();
        scheme.surcharges = vec![
            Surcharge {
                id: 1,
                scheme_id: 1,
                name: "bulky".to_string(),
                active: true,
                priority: 100,
                condition_json: SurchargeCondition {
                    dest: None,
                    flag_any: vec!["bulky".to_string()],
                },
                amount_json: SurchargeAmount::Flat { amount: d("5") },
            },
            Surcharge {
                id: 2,
                scheme_id: 1,
                name: "remote".to_string(),
                active: true,
                priority: 50,
                condition_json: SurchargeCondition {
                    dest: Some(DestCondition {
                        province: vec!["浙江省".to_string()],
                        ..Default::default()
                    }),
                    flag_any: vec![],
                },
                amount_json: SurchargeAmount::PerKg {
                    rate_per_kg: d("0.333"),
                },
            },
        ];

        let plain = compute_quote(&scheme, &templates, &request("1")).unwrap();
        assert_eq!(plain.surcharges.len(), 1);
        assert_eq!(plain.surcharges[0].amount, d("0.33"));
        assert_eq!(plain.total, d("8.33"));

        let mut req = request("1");
        req.flags = vec!["bulky".to_string()];
        let bulky = compute_quote(&scheme, &templates, &req).unwrap();
        assert_eq!(
            bulky.surcharges.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(bulky.total, d("13.33"));
    }

    #[test]
    fn test_city_member_wins() {
        let (mut scheme, _) = fixture();
        let mut other = scheme.zones[0].clone();
        other.id = 6;
        other.members = vec![ZoneMember::province("上海市")];
        scheme.zones.insert(0, other);
        let zone = resolve_zone(&scheme.zones, "上海市", Some("上海市")).unwrap();
        assert_eq!(zone.id, 5);
        assert_eq!(resolve_zone(&scheme.zones, "上海市", None).unwrap().id, 6);
    }
}
