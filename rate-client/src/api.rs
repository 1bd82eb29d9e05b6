//! Pricing backend API surface consumed by the engine

use crate::ClientResult;
use async_trait::async_trait;
use shared::models::{
    Bracket, BracketCreate, BracketPatch, CopyBracketsRequest, CopyBracketsResult,
    DestAdjustment, DestAdjustmentUpdate, DestAdjustmentUpsert, PricingSchemeDetail,
    ProvinceMembersPut, SegmentTemplate, SegmentTemplateCreate, Surcharge, SurchargeCreate,
    SurchargeUpdate, TemplateItemInput, Zone, ZoneBracketsMatrixOut, ZoneCreateAtomic, ZoneUpdate,
};

/// CRUD operations of the pricing backend
///
/// Implemented over HTTP by [`crate::NetworkRateClient`] and in process by
/// [`crate::InMemoryRateApi`].
#[async_trait]
pub trait RateApi: Send + Sync {
    // ========== Schemes ==========

    /// `GET /pricing-schemes/{id}`
    async fn scheme_detail(&self, scheme_id: i64) -> ClientResult<PricingSchemeDetail>;

    /// `GET /pricing-schemes/{id}/zone-brackets-matrix`
    async fn zone_brackets_matrix(&self, scheme_id: i64) -> ClientResult<ZoneBracketsMatrixOut>;

    // ========== Segment templates ==========

    async fn segment_templates(&self, scheme_id: i64) -> ClientResult<Vec<SegmentTemplate>>;

    async fn segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate>;

    async fn create_segment_template(
        &self,
        scheme_id: i64,
        payload: &SegmentTemplateCreate,
    ) -> ClientResult<SegmentTemplate>;

    /// Replace all items of a draft template
    async fn put_template_items(
        &self,
        template_id: i64,
        items: &[TemplateItemInput],
    ) -> ClientResult<SegmentTemplate>;

    async fn publish_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate>;

    async fn activate_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate>;

    /// Retire a template; it can no longer be bound or edited
    async fn archive_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate>;

    /// Toggle one item; the only edit a published template accepts
    async fn patch_template_item_active(
        &self,
        item_id: i64,
        active: bool,
    ) -> ClientResult<SegmentTemplate>;

    // ========== Brackets ==========

    /// Upsert keyed by `(zone_id, min_kg, max_kg)`
    async fn create_bracket(&self, zone_id: i64, payload: &BracketCreate) -> ClientResult<Bracket>;

    async fn patch_bracket(&self, bracket_id: i64, payload: &BracketPatch)
    -> ClientResult<Bracket>;

    async fn delete_bracket(&self, bracket_id: i64) -> ClientResult<()>;

    async fn copy_brackets(
        &self,
        target_zone_id: i64,
        payload: &CopyBracketsRequest,
    ) -> ClientResult<CopyBracketsResult>;

    // ========== Zones ==========

    async fn create_zone_atomic(
        &self,
        scheme_id: i64,
        payload: &ZoneCreateAtomic,
    ) -> ClientResult<Zone>;

    async fn patch_zone(&self, zone_id: i64, payload: &ZoneUpdate) -> ClientResult<Zone>;

    async fn replace_province_members(
        &self,
        zone_id: i64,
        payload: &ProvinceMembersPut,
    ) -> ClientResult<Zone>;

    // ========== Destination adjustments ==========

    async fn upsert_dest_adjustment(
        &self,
        scheme_id: i64,
        payload: &DestAdjustmentUpsert,
    ) -> ClientResult<DestAdjustment>;

    async fn patch_dest_adjustment(
        &self,
        adjustment_id: i64,
        payload: &DestAdjustmentUpdate,
    ) -> ClientResult<DestAdjustment>;

    async fn delete_dest_adjustment(&self, adjustment_id: i64) -> ClientResult<()>;

    // ========== Surcharges ==========

    async fn create_surcharge(
        &self,
        scheme_id: i64,
        payload: &SurchargeCreate,
    ) -> ClientResult<Surcharge>;

    async fn patch_surcharge(
        &self,
        surcharge_id: i64,
        payload: &SurchargeUpdate,
    ) -> ClientResult<Surcharge>;
}
