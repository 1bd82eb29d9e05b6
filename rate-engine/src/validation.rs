//! Write guards checked before any request is issued

use crate::error::{EngineError, EngineResult};
use shared::models::{PricingSchemeDetail, Zone};

pub fn ensure_scheme_writable(scheme: &PricingSchemeDetail) -> EngineResult<()> {
    if scheme.is_archived() {
        return Err(EngineError::Archived(format!("scheme {}", scheme.id)));
    }
    Ok(())
}

pub fn ensure_zone_writable(zone: &Zone) -> EngineResult<()> {
    if zone.is_archived() {
        return Err(EngineError::Archived(format!("zone {}", zone.id)));
    }
    Ok(())
}

/// Scheme guard plus, when given, the guard of one of its zones
pub fn ensure_writable(scheme: &PricingSchemeDetail, zone_id: Option<i64>) -> EngineResult<()> {
    ensure_scheme_writable(scheme)?;
    if let Some(zone_id) = zone_id {
        let zone = scheme
            .zone(zone_id)
            .ok_or_else(|| EngineError::NotFound(format!("zone {zone_id}")))?;
        ensure_zone_writable(zone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(archived: bool, zone_archived: bool) -> PricingSchemeDetail {
        PricingSchemeDetail {
            id: 1,
            shipping_provider_id: 1,
            name: "s".to_string(),
            active: true,
            archived_at: archived.then(|| "2026-01-01T00:00:00Z".to_string()),
            currency: "CNY".to_string(),
            default_pricing_mode: None,
            billable_weight_rule: None,
            default_segment_template_id: None,
            zones: vec![Zone {
                id: 5,
                scheme_id: 1,
                name: "east".to_string(),
                active: true,
                archived_at: zone_archived.then(|| "2026-01-01T00:00:00Z".to_string()),
                segment_template_id: None,
                members: vec![],
                brackets: None,
            }],
            surcharges: vec![],
            dest_adjustments: vec![],
        }
    }

    #[test]
    fn test_archived_scheme_is_rejected() {
        let err = ensure_writable(&scheme(true, false), None).unwrap_err();
        assert!(matches!(err, EngineError::Archived(_)));
    }

    #[test]
    fn test_archived_zone_is_rejected() {
        assert!(ensure_writable(&scheme(false, false), Some(5)).is_ok());
        let err = ensure_writable(&scheme(false, true), Some(5)).unwrap_err();
        assert_eq!(err.user_message(), "zone 5 is archived and read-only");
    }

    #[test]
    fn test_unknown_zone() {
        let err = ensure_writable(&scheme(false, false), Some(9)).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
