//! In-process pricing backend
//!
//! Mirrors the server-side rules the engine depends on: bracket upsert by
//! `(zone, min, max)`, copy conflict policies, RESTRICT delete of referenced
//! brackets, province occupancy across active zones and province/city
//! mutual exclusion of destination adjustments. Used by tests.

use crate::{ClientError, ClientResult, RateApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivePolicy, AdjustmentScope, Bracket, BracketCreate, BracketPatch, ConflictPolicy,
    CopyBracketsRequest, CopyBracketsResult, CopySummary, DestAdjustment, DestAdjustmentUpdate,
    DestAdjustmentUpsert, MatrixGroupOut, MemberLevel, PricingSchemeDetail, ProvinceMembersPut,
    SegmentTemplate, SegmentTemplateCreate, Surcharge, SurchargeCreate, SurchargeUpdate,
    TemplateItem, TemplateItemInput, TemplateStatus, Zone, ZoneBracketsMatrixOut,
    ZoneCreateAtomic, ZoneMember, ZoneUpdate,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

const SCOPE_CONFLICT_TAG: &str = "dest_adjustment_scope_conflict";
const PROVINCE_OCCUPIED_TAG: &str = "province_occupied";

/// Normalized `(min, max)` of a bracket, `None` when the interval is invalid
fn bracket_key(b: &Bracket) -> Option<(Decimal, Option<Decimal>)> {
    let min = b.min_kg.value()?.normalize();
    let max = match &b.max_kg {
        None => None,
        Some(m) => Some(m.value()?.normalize()),
    };
    if max.is_some_and(|m| m <= min) {
        return None;
    }
    Some((min, max))
}

#[derive(Default)]
struct State {
    next_id: i64,
    schemes: BTreeMap<i64, PricingSchemeDetail>,
    zones: BTreeMap<i64, Zone>,
    brackets: BTreeMap<i64, Bracket>,
    templates: BTreeMap<i64, SegmentTemplate>,
    adjustments: BTreeMap<i64, DestAdjustment>,
    surcharges: BTreeMap<i64, Surcharge>,
    referenced_brackets: HashSet<i64>,
    partial_zones: HashSet<i64>,
    failing_copy_targets: HashSet<i64>,
    failing_bracket_creates: HashSet<(i64, Decimal)>,
    calls: usize,
}

impl State {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn reserve_id(&mut self, id: i64) {
        self.next_id = self.next_id.max(id);
    }

    fn scheme(&self, scheme_id: i64) -> Result<&PricingSchemeDetail, AppError> {
        self.schemes
            .get(&scheme_id)
            .ok_or_else(|| AppError::new(ErrorCode::SchemeNotFound))
    }

    fn writable_scheme(&self, scheme_id: i64) -> Result<&PricingSchemeDetail, AppError> {
        let scheme = self.scheme(scheme_id)?;
        if scheme.is_archived() {
            return Err(AppError::new(ErrorCode::SchemeArchived));
        }
        Ok(scheme)
    }

    fn zone(&self, zone_id: i64) -> Result<&Zone, AppError> {
        self.zones
            .get(&zone_id)
            .ok_or_else(|| AppError::new(ErrorCode::ZoneNotFound))
    }

    fn writable_zone(&self, zone_id: i64) -> Result<&Zone, AppError> {
        let zone = self.zone(zone_id)?;
        if zone.is_archived() {
            return Err(AppError::new(ErrorCode::ZoneArchived));
        }
        self.writable_scheme(zone.scheme_id)?;
        Ok(zone)
    }

    fn zone_brackets(&self, zone_id: i64) -> Vec<Bracket> {
        self.brackets
            .values()
            .filter(|b| b.zone_id == zone_id)
            .cloned()
            .collect()
    }

    fn find_bracket_by_key(
        &self,
        zone_id: i64,
        key: &(Decimal, Option<Decimal>),
    ) -> Option<i64> {
        self.brackets
            .values()
            .find(|b| b.zone_id == zone_id && bracket_key(b).as_ref() == Some(key))
            .map(|b| b.id)
    }

    fn zone_view(&self, zone_id: i64) -> Option<Zone> {
        let mut zone = self.zones.get(&zone_id)?.clone();
        zone.brackets = if self.partial_zones.contains(&zone_id) {
            None
        } else {
            Some(self.zone_brackets(zone_id))
        };
        Some(zone)
    }

    fn scheme_zone_ids(&self, scheme_id: i64) -> Vec<i64> {
        self.zones
            .values()
            .filter(|z| z.scheme_id == scheme_id)
            .map(|z| z.id)
            .collect()
    }

    /// Active zones of the scheme (other than `except`) already holding one of `provinces`
    fn occupying_zones(&self, scheme_id: i64, provinces: &[String], except: Option<i64>) -> Vec<i64> {
        self.zones
            .values()
            .filter(|z| z.scheme_id == scheme_id && z.is_live() && Some(z.id) != except)
            .filter(|z| {
                z.member_values(MemberLevel::Province)
                    .any(|p| provinces.iter().any(|q| q == p))
            })
            .map(|z| z.id)
            .collect()
    }

    /// Active adjustments of the opposite scope for the same province
    fn scope_conflicts(
        &self,
        scheme_id: i64,
        scope: AdjustmentScope,
        province_code: &str,
        except: Option<i64>,
    ) -> Vec<i64> {
        self.adjustments
            .values()
            .filter(|a| {
                a.scheme_id == scheme_id
                    && a.active
                    && a.scope != scope
                    && a.province_code == province_code
                    && Some(a.id) != except
            })
            .map(|a| a.id)
            .collect()
    }

    fn template_of_item(&mut self, item_id: i64) -> Option<&mut SegmentTemplate> {
        self.templates
            .values_mut()
            .find(|t| t.items.iter().any(|i| i.id == item_id))
    }
}

/// In-memory implementation of [`RateApi`]
#[derive(Default)]
pub struct InMemoryRateApi {
    state: Mutex<State>,
    latency: Mutex<Option<Duration>>,
    copy_stalls: Mutex<HashMap<i64, Duration>>,
}

impl InMemoryRateApi {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    /// Load a scheme with its zones, brackets, adjustments and surcharges
    pub fn seed_scheme(&self, mut scheme: PricingSchemeDetail) {
        let mut state = self.state.lock();
        state.reserve_id(scheme.id);
        for mut zone in std::mem::take(&mut scheme.zones) {
            state.reserve_id(zone.id);
            for bracket in zone.brackets.take().unwrap_or_default() {
                state.reserve_id(bracket.id);
                state.brackets.insert(bracket.id, bracket);
            }
            state.zones.insert(zone.id, zone);
        }
        for adj in std::mem::take(&mut scheme.dest_adjustments) {
            state.reserve_id(adj.id);
            state.adjustments.insert(adj.id, adj);
        }
        for s in std::mem::take(&mut scheme.surcharges) {
            state.reserve_id(s.id);
            state.surcharges.insert(s.id, s);
        }
        state.schemes.insert(scheme.id, scheme);
    }

    pub fn seed_template(&self, template: SegmentTemplate) {
        let mut state = self.state.lock();
        state.reserve_id(template.id);
        for item in &template.items {
            state.reserve_id(item.id);
        }
        state.templates.insert(template.id, template);
    }

    /// Mark a bracket as referenced so deletes hit the RESTRICT constraint
    pub fn mark_referenced(&self, bracket_id: i64) {
        self.state.lock().referenced_brackets.insert(bracket_id);
    }

    /// Serve this zone without its `brackets` field, like a lazy backend
    pub fn omit_brackets_for(&self, zone_id: i64) {
        self.state.lock().partial_zones.insert(zone_id);
    }

    /// Make every copy into this zone fail with a database error
    pub fn fail_copy_into(&self, zone_id: i64) {
        self.state.lock().failing_copy_targets.insert(zone_id);
    }

    /// Make creating the bracket starting at `min_kg` in this zone fail
    pub fn fail_bracket_create_at(&self, zone_id: i64, min_kg: Decimal) {
        self.state
            .lock()
            .failing_bracket_creates
            .insert((zone_id, min_kg.normalize()));
    }

    /// Hold every copy into this zone for `delay` before it runs
    pub fn stall_copy_into(&self, zone_id: i64, delay: Duration) {
        self.copy_stalls.lock().insert(zone_id, delay);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    // ========== Inspection ==========

    /// Number of API calls served
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn brackets_of(&self, zone_id: i64) -> Vec<Bracket> {
        self.state.lock().zone_brackets(zone_id)
    }

    pub fn adjustment(&self, id: i64) -> Option<DestAdjustment> {
        self.state.lock().adjustments.get(&id).cloned()
    }

    pub fn zone(&self, id: i64) -> Option<Zone> {
        self.state.lock().zone_view(id)
    }

    async fn enter(&self) {
        self.state.lock().calls += 1;
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> Result<T, AppError>) -> ClientResult<T> {
        let mut state = self.state.lock();
        f(&mut *state).map_err(ClientError::from)
    }
}

fn copy_into(
    state: &mut State,
    target_zone_id: i64,
    req: &CopyBracketsRequest,
) -> Result<CopySummary, AppError> {
    if req.source_zone_id == target_zone_id {
        return Err(AppError::with_message(
            ErrorCode::CopySourceInvalid,
            "source and target zone are the same",
        ));
    }
    let source = state.zone(req.source_zone_id)?.clone();
    let target = state.writable_zone(target_zone_id)?.clone();
    if source.scheme_id != target.scheme_id {
        return Err(AppError::with_message(
            ErrorCode::CopySourceInvalid,
            "source zone belongs to another scheme",
        ));
    }
    if state.failing_copy_targets.contains(&target_zone_id) {
        return Err(AppError::database(format!(
            "copy into zone {target_zone_id} aborted"
        )));
    }

    let mut summary = CopySummary::default();
    for src in state.zone_brackets(source.id) {
        if !src.active && !req.include_inactive {
            continue;
        }
        if let Some(modes) = &req.pricing_modes
            && !src.pricing_mode.is_some_and(|m| modes.contains(&m))
        {
            continue;
        }
        let Some(key) = bracket_key(&src) else {
            tracing::warn!(bracket_id = src.id, "skipping bracket with invalid interval");
            continue;
        };
        let active = match req.active_policy {
            ActivePolicy::ForceActive => true,
            ActivePolicy::Preserve => src.active,
        };

        match state.find_bracket_by_key(target_zone_id, &key) {
            Some(existing_id) => match req.conflict_policy {
                ConflictPolicy::Skip => summary.skipped_count += 1,
                ConflictPolicy::Overwrite => {
                    if let Some(existing) = state.brackets.get_mut(&existing_id) {
                        existing.pricing_mode = src.pricing_mode;
                        existing.flat_amount = src.flat_amount.clone();
                        existing.base_amount = src.base_amount.clone();
                        existing.rate_per_kg = src.rate_per_kg.clone();
                        existing.base_kg = src.base_kg.clone();
                        existing.active = active;
                        summary.updated_count += 1;
                    } else {
                        summary.failed_count += 1;
                    }
                }
            },
            None => {
                let id = state.alloc_id();
                let copy = Bracket {
                    id,
                    zone_id: target_zone_id,
                    active,
                    price_json: None,
                    ..src
                };
                state.brackets.insert(id, copy);
                summary.created_count += 1;
            }
        }
    }
    Ok(summary)
}

#[async_trait]
impl RateApi for InMemoryRateApi {
    async fn scheme_detail(&self, scheme_id: i64) -> ClientResult<PricingSchemeDetail> {
        self.enter().await;
        self.with_state(|state| {
            let mut scheme = state.scheme(scheme_id)?.clone();
            scheme.zones = state
                .scheme_zone_ids(scheme_id)
                .into_iter()
                .filter_map(|id| state.zone_view(id))
                .collect();
            scheme.dest_adjustments = state
                .adjustments
                .values()
                .filter(|a| a.scheme_id == scheme_id)
                .cloned()
                .collect();
            scheme.surcharges = state
                .surcharges
                .values()
                .filter(|s| s.scheme_id == scheme_id)
                .cloned()
                .collect();
            Ok(scheme)
        })
    }

    async fn zone_brackets_matrix(&self, scheme_id: i64) -> ClientResult<ZoneBracketsMatrixOut> {
        self.enter().await;
        self.with_state(|state| {
            state.scheme(scheme_id)?;
            let mut groups: BTreeMap<i64, MatrixGroupOut> = BTreeMap::new();
            let mut unbound_zones = Vec::new();
            for zone_id in state.scheme_zone_ids(scheme_id) {
                let Some(zone) = state.zone_view(zone_id) else {
                    continue;
                };
                let template = zone
                    .segment_template_id
                    .and_then(|tid| state.templates.get(&tid));
                match template {
                    Some(t) => groups
                        .entry(t.id)
                        .or_insert_with(|| MatrixGroupOut {
                            segment_template_id: t.id,
                            template_name: t.name.clone(),
                            segments: t.sorted_items().into_iter().cloned().collect(),
                            zones: Vec::new(),
                        })
                        .zones
                        .push(zone),
                    None => unbound_zones.push(zone),
                }
            }
            Ok(ZoneBracketsMatrixOut {
                groups: groups.into_values().collect(),
                unbound_zones,
            })
        })
    }

    async fn segment_templates(&self, scheme_id: i64) -> ClientResult<Vec<SegmentTemplate>> {
        self.enter().await;
        self.with_state(|state| {
            state.scheme(scheme_id)?;
            Ok(state
                .templates
                .values()
                .filter(|t| t.scheme_id == scheme_id)
                .cloned()
                .collect())
        })
    }

    async fn segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            state
                .templates
                .get(&template_id)
                .cloned()
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))
        })
    }

    async fn create_segment_template(
        &self,
        scheme_id: i64,
        payload: &SegmentTemplateCreate,
    ) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            state.writable_scheme(scheme_id)?;
            let name = payload.name.trim();
            if name.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::RequiredField,
                    "template name is required",
                ));
            }
            let id = state.alloc_id();
            let template = SegmentTemplate {
                id,
                scheme_id,
                name: name.to_string(),
                status: TemplateStatus::Draft,
                is_active: false,
                items: Vec::new(),
            };
            state.templates.insert(id, template.clone());
            Ok(template)
        })
    }

    async fn put_template_items(
        &self,
        template_id: i64,
        items: &[TemplateItemInput],
    ) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            let editable = state
                .templates
                .get(&template_id)
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))?
                .items_editable();
            if !editable {
                return Err(AppError::new(ErrorCode::TemplateReadOnly));
            }
            let mut rows = Vec::with_capacity(items.len());
            for input in items {
                rows.push(TemplateItem {
                    id: state.alloc_id(),
                    ord: input.ord,
                    min_kg: input.min_kg.into(),
                    max_kg: input.max_kg.map(Into::into),
                    active: input.active,
                });
            }
            let template = state
                .templates
                .get_mut(&template_id)
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))?;
            template.items = rows;
            Ok(template.clone())
        })
    }

    async fn publish_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            let template = state
                .templates
                .get_mut(&template_id)
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))?;
            if template.status != TemplateStatus::Draft {
                return Err(AppError::new(ErrorCode::TemplateReadOnly));
            }
            if template.items.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::SegmentInvalid,
                    "cannot publish a template without segments",
                ));
            }
            template.status = TemplateStatus::Published;
            Ok(template.clone())
        })
    }

    async fn activate_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            let template = state
                .templates
                .get_mut(&template_id)
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))?;
            if template.status != TemplateStatus::Published {
                return Err(AppError::validation(
                    "only published templates can be activated",
                ));
            }
            template.is_active = true;
            Ok(template.clone())
        })
    }

    async fn archive_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            let template = state
                .templates
                .get_mut(&template_id)
                .ok_or_else(|| AppError::new(ErrorCode::TemplateNotFound))?;
            template.status = TemplateStatus::Archived;
            template.is_active = false;
            Ok(template.clone())
        })
    }

    async fn patch_template_item_active(
        &self,
        item_id: i64,
        active: bool,
    ) -> ClientResult<SegmentTemplate> {
        self.enter().await;
        self.with_state(|state| {
            let template = state
                .template_of_item(item_id)
                .ok_or_else(|| AppError::not_found(format!("Template item {item_id}")))?;
            if template.status == TemplateStatus::Archived {
                return Err(AppError::new(ErrorCode::TemplateReadOnly));
            }
            if let Some(item) = template.items.iter_mut().find(|i| i.id == item_id) {
                item.active = active;
            }
            Ok(template.clone())
        })
    }

    async fn create_bracket(&self, zone_id: i64, payload: &BracketCreate) -> ClientResult<Bracket> {
        self.enter().await;
        self.with_state(|state| {
            state.writable_zone(zone_id)?;
            let min = payload.min_kg.normalize();
            let max = payload.max_kg.map(|m| m.normalize());
            if max.is_some_and(|m| m <= min) || min.is_sign_negative() {
                return Err(AppError::new(ErrorCode::BracketKeyInvalid));
            }
            if state.failing_bracket_creates.contains(&(zone_id, min)) {
                return Err(AppError::database(format!(
                    "insert into zone {zone_id} at {min}kg aborted"
                )));
            }
            let key = (min, max);
            if let Some(id) = state.find_bracket_by_key(zone_id, &key)
                && let Some(existing) = state.brackets.get_mut(&id)
            {
                existing.apply_rule(&payload.rule);
                existing.active = payload.active;
                return Ok(existing.clone());
            }
            let id = state.alloc_id();
            let bracket = Bracket::from_rule(
                id,
                zone_id,
                payload.min_kg,
                payload.max_kg,
                &payload.rule,
                payload.active,
            );
            state.brackets.insert(id, bracket.clone());
            Ok(bracket)
        })
    }

    async fn patch_bracket(
        &self,
        bracket_id: i64,
        payload: &BracketPatch,
    ) -> ClientResult<Bracket> {
        self.enter().await;
        self.with_state(|state| {
            let zone_id = state
                .brackets
                .get(&bracket_id)
                .ok_or_else(|| AppError::new(ErrorCode::BracketNotFound))?
                .zone_id;
            state.writable_zone(zone_id)?;
            let bracket = state
                .brackets
                .get_mut(&bracket_id)
                .ok_or_else(|| AppError::new(ErrorCode::BracketNotFound))?;
            bracket.apply_rule(&payload.rule);
            if let Some(active) = payload.active {
                bracket.active = active;
            }
            Ok(bracket.clone())
        })
    }

    async fn delete_bracket(&self, bracket_id: i64) -> ClientResult<()> {
        self.enter().await;
        self.with_state(|state| {
            if !state.brackets.contains_key(&bracket_id) {
                return Err(AppError::new(ErrorCode::BracketNotFound));
            }
            if state.referenced_brackets.contains(&bracket_id) {
                return Err(AppError::with_message(
                    ErrorCode::BracketInUse,
                    format!(
                        "update or delete on table \"pricing_scheme_zone_brackets\" violates \
                         foreign key constraint (RESTRICT): key (id)=({bracket_id}) is still referenced"
                    ),
                ));
            }
            state.brackets.remove(&bracket_id);
            Ok(())
        })
    }

    async fn copy_brackets(
        &self,
        target_zone_id: i64,
        payload: &CopyBracketsRequest,
    ) -> ClientResult<CopyBracketsResult> {
        self.enter().await;
        let stall = self.copy_stalls.lock().get(&target_zone_id).copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|state| {
            let summary = copy_into(state, target_zone_id, payload)?;
            Ok(CopyBracketsResult { summary })
        })
    }

    async fn create_zone_atomic(
        &self,
        scheme_id: i64,
        payload: &ZoneCreateAtomic,
    ) -> ClientResult<Zone> {
        self.enter().await;
        self.with_state(|state| {
            state.writable_scheme(scheme_id)?;
            let name = payload.name.trim();
            if name.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::RequiredField,
                    "zone name is required",
                ));
            }
            if payload.provinces.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::RequiredField,
                    "at least one province is required",
                ));
            }
            if payload.active {
                let occupied = state.occupying_zones(scheme_id, &payload.provinces, None);
                if !occupied.is_empty() {
                    return Err(AppError::conflict_with_ids(
                        ErrorCode::ProvinceOccupied,
                        PROVINCE_OCCUPIED_TAG,
                        &occupied,
                    ));
                }
            }
            let id = state.alloc_id();
            let zone = Zone {
                id,
                scheme_id,
                name: name.to_string(),
                active: payload.active,
                archived_at: None,
                segment_template_id: payload.segment_template_id,
                members: payload.provinces.iter().map(ZoneMember::province).collect(),
                brackets: None,
            };
            state.zones.insert(id, zone);
            state
                .zone_view(id)
                .ok_or_else(|| AppError::internal("zone vanished after insert"))
        })
    }

    async fn patch_zone(&self, zone_id: i64, payload: &ZoneUpdate) -> ClientResult<Zone> {
        self.enter().await;
        self.with_state(|state| {
            let zone = state.writable_zone(zone_id)?.clone();
            if payload.active == Some(true) && !zone.active {
                let provinces: Vec<String> = zone
                    .member_values(MemberLevel::Province)
                    .map(str::to_string)
                    .collect();
                let occupied = state.occupying_zones(zone.scheme_id, &provinces, Some(zone_id));
                if !occupied.is_empty() {
                    return Err(AppError::conflict_with_ids(
                        ErrorCode::ProvinceOccupied,
                        PROVINCE_OCCUPIED_TAG,
                        &occupied,
                    ));
                }
            }
            if let Some(tid) = payload.segment_template_id
                && !state.templates.contains_key(&tid)
            {
                return Err(AppError::new(ErrorCode::TemplateNotFound));
            }
            let zone = state
                .zones
                .get_mut(&zone_id)
                .ok_or_else(|| AppError::new(ErrorCode::ZoneNotFound))?;
            if let Some(name) = &payload.name {
                zone.name = name.clone();
            }
            if let Some(active) = payload.active {
                zone.active = active;
            }
            if payload.segment_template_id.is_some() {
                zone.segment_template_id = payload.segment_template_id;
            }
            state
                .zone_view(zone_id)
                .ok_or_else(|| AppError::new(ErrorCode::ZoneNotFound))
        })
    }

    async fn replace_province_members(
        &self,
        zone_id: i64,
        payload: &ProvinceMembersPut,
    ) -> ClientResult<Zone> {
        self.enter().await;
        self.with_state(|state| {
            let zone = state.writable_zone(zone_id)?.clone();
            if zone.active {
                let occupied =
                    state.occupying_zones(zone.scheme_id, &payload.provinces, Some(zone_id));
                if !occupied.is_empty() {
                    return Err(AppError::conflict_with_ids(
                        ErrorCode::ProvinceOccupied,
                        PROVINCE_OCCUPIED_TAG,
                        &occupied,
                    ));
                }
            }
            let zone = state
                .zones
                .get_mut(&zone_id)
                .ok_or_else(|| AppError::new(ErrorCode::ZoneNotFound))?;
            zone.members.retain(|m| m.level != MemberLevel::Province);
            zone.members
                .extend(payload.provinces.iter().map(ZoneMember::province));
            state
                .zone_view(zone_id)
                .ok_or_else(|| AppError::new(ErrorCode::ZoneNotFound))
        })
    }

    async fn upsert_dest_adjustment(
        &self,
        scheme_id: i64,
        payload: &DestAdjustmentUpsert,
    ) -> ClientResult<DestAdjustment> {
        self.enter().await;
        self.with_state(|state| {
            state.writable_scheme(scheme_id)?;
            if payload.scope == AdjustmentScope::City && payload.city_code.is_none() {
                return Err(AppError::with_message(
                    ErrorCode::RequiredField,
                    "city scope requires city_code",
                ));
            }
            let city_code = match payload.scope {
                AdjustmentScope::Province => None,
                AdjustmentScope::City => payload.city_code.clone(),
            };
            let existing = state
                .adjustments
                .values()
                .find(|a| {
                    a.scheme_id == scheme_id
                        && a.scope == payload.scope
                        && a.province_code == payload.province_code
                        && a.city_code == city_code
                })
                .map(|a| a.id);

            if payload.active {
                let conflicts = state.scope_conflicts(
                    scheme_id,
                    payload.scope,
                    &payload.province_code,
                    existing,
                );
                if !conflicts.is_empty() {
                    let mut ids: Vec<i64> = existing.into_iter().collect();
                    ids.extend(conflicts);
                    return Err(AppError::conflict_with_ids(
                        ErrorCode::AdjustmentScopeConflict,
                        SCOPE_CONFLICT_TAG,
                        &ids,
                    ));
                }
            }

            let id = match existing {
                Some(id) => id,
                None => state.alloc_id(),
            };
            let adjustment = DestAdjustment {
                id,
                scheme_id,
                scope: payload.scope,
                province_code: payload.province_code.clone(),
                city_code,
                province_name: payload.province_name.clone(),
                city_name: payload.city_name.clone(),
                amount: payload.amount,
                active: payload.active,
                priority: payload.priority,
            };
            state.adjustments.insert(id, adjustment.clone());
            Ok(adjustment)
        })
    }

    async fn patch_dest_adjustment(
        &self,
        adjustment_id: i64,
        payload: &DestAdjustmentUpdate,
    ) -> ClientResult<DestAdjustment> {
        self.enter().await;
        self.with_state(|state| {
            let current = state
                .adjustments
                .get(&adjustment_id)
                .cloned()
                .ok_or_else(|| AppError::new(ErrorCode::AdjustmentNotFound))?;
            state.writable_scheme(current.scheme_id)?;
            if payload.active == Some(true) && !current.active {
                let conflicts = state.scope_conflicts(
                    current.scheme_id,
                    current.scope,
                    &current.province_code,
                    Some(adjustment_id),
                );
                if !conflicts.is_empty() {
                    let mut ids = vec![adjustment_id];
                    ids.extend(conflicts);
                    return Err(AppError::conflict_with_ids(
                        ErrorCode::AdjustmentScopeConflict,
                        SCOPE_CONFLICT_TAG,
                        &ids,
                    ));
                }
            }
            let adj = state
                .adjustments
                .get_mut(&adjustment_id)
                .ok_or_else(|| AppError::new(ErrorCode::AdjustmentNotFound))?;
            if let Some(active) = payload.active {
                adj.active = active;
            }
            if let Some(amount) = payload.amount {
                adj.amount = amount;
            }
            if let Some(priority) = payload.priority {
                adj.priority = priority;
            }
            Ok(adj.clone())
        })
    }

    async fn delete_dest_adjustment(&self, adjustment_id: i64) -> ClientResult<()> {
        self.enter().await;
        self.with_state(|state| {
            state
                .adjustments
                .remove(&adjustment_id)
                .map(|_| ())
                .ok_or_else(|| AppError::new(ErrorCode::AdjustmentNotFound))
        })
    }

    async fn create_surcharge(
        &self,
        scheme_id: i64,
        payload: &SurchargeCreate,
    ) -> ClientResult<Surcharge> {
        self.enter().await;
        self.with_state(|state| {
            state.writable_scheme(scheme_id)?;
            let id = state.alloc_id();
            let surcharge = Surcharge {
                id,
                scheme_id,
                name: payload.name.clone(),
                active: payload.active,
                priority: payload.priority,
                condition_json: payload.condition_json.clone(),
                amount_json: payload.amount_json.clone(),
            };
            state.surcharges.insert(id, surcharge.clone());
            Ok(surcharge)
        })
    }

    async fn patch_surcharge(
        &self,
        surcharge_id: i64,
        payload: &SurchargeUpdate,
    ) -> ClientResult<Surcharge> {
        self.enter().await;
        self.with_state(|state| {
            let s = state
                .surcharges
                .get_mut(&surcharge_id)
                .ok_or_else(|| AppError::new(ErrorCode::SurchargeNotFound))?;
            if let Some(name) = &payload.name {
                s.name = name.clone();
            }
            if let Some(active) = payload.active {
                s.active = active;
            }
            if let Some(priority) = payload.priority {
                s.priority = priority;
            }
            if let Some(cond) = &payload.condition_json {
                s.condition_json = cond.clone();
            }
            if let Some(amount) = &payload.amount_json {
                s.amount_json = amount.clone();
            }
            Ok(s.clone())
        })
    }
}
