//! Pricing workbench
//!
//! The mutation boundary of one pricing scheme. Every write goes through
//! here: local guards and validation first, then a single request bounded by
//! the mutation timeout, then the caches are updated and the refresher is
//! told what changed. Failures come back as one [`EngineError`]; the busy
//! count is released on every path.
//!
//! Concurrent calls are not serialized. Callers gate repeated submissions on
//! [`PricingWorkbench::is_busy`]; two writers of the same cell end up
//! last-write-wins at the backend.

use crate::config::EngineConfig;
use crate::copy::{CopyOptions, CopyReport, copy_to_targets};
use crate::error::{EngineError, EngineResult};
use crate::keys::{BracketKey, CellKey, key_from_bracket};
use crate::matrix::{KeyDiagnostics, MatrixColumn, ZoneMatrix, diagnose_zone_keys};
use crate::occupancy::build_province_occupancy;
use crate::pricing::{RowDraft, format_money, summarize_bracket, validate_draft_for_save};
use crate::quote::{QuoteBreakdown, QuoteRequest, compute_quote};
use crate::reconcile::{MergeReport, SchemeCache};
use crate::refresh::{ChangeEvent, MatrixRefresher, MatrixSlot, RefreshHandle, reload_matrix};
use crate::segments::{SegmentDraft, ensure_items_editable, to_weight_segments};
use crate::validation::{ensure_scheme_writable, ensure_writable};
use parking_lot::{Mutex, RwLock};
use rate_client::{ClientResult, RateApi};
use rust_decimal::Decimal;
use shared::models::{
    AdjustmentScope, Bracket, BracketCreate, BracketPatch, DestAdjustment, DestAdjustmentUpdate,
    DestAdjustmentUpsert, MemberLevel, PricingMode, PricingRule, PricingSchemeDetail,
    ProvinceMembersPut, SegmentTemplate, SegmentTemplateCreate, Surcharge, SurchargeAmount,
    SurchargeCreate, SurchargeUpdate, TemplateItemInput, TemplateStatus, Zone, ZoneCreateAtomic,
    ZoneUpdate,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;

const BULKY_FLAG: &str = "bulky";

/// Outcome of a destructive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmable<T> {
    /// Nothing was done; re-invoke with `confirmed = true` after showing `summary`
    NeedsConfirmation { summary: String },
    Done(T),
}

impl<T> Confirmable<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Confirmable::Done(_))
    }
}

/// Counters of a whole-zone save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneSaveReport {
    pub created: usize,
    pub updated: usize,
}

struct BusyGuard(Arc<AtomicUsize>);

impl BusyGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    scheme: PricingSchemeDetail,
    templates: Vec<SegmentTemplate>,
}

pub struct PricingWorkbench<A: ?Sized> {
    api: Arc<A>,
    config: EngineConfig,
    scheme_id: i64,
    snapshot: RwLock<Snapshot>,
    /// Written only by the latest reload, whether explicit or debounced
    matrix: MatrixSlot,
    cache: Arc<Mutex<SchemeCache>>,
    busy: Arc<AtomicUsize>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl<A> PricingWorkbench<A>
where
    A: RateApi + ?Sized + 'static,
{
    /// Load a scheme, its templates and its matrix
    pub async fn open(api: Arc<A>, scheme_id: i64, config: EngineConfig) -> EngineResult<Self> {
        let scheme = api.scheme_detail(scheme_id).await?;
        let templates = api.segment_templates(scheme_id).await?;
        let fallback = Self::fallback_for(&scheme, &config);
        let cache = Arc::new(Mutex::new(SchemeCache::new(scheme_id, fallback)));
        let matrix: MatrixSlot = Arc::new(RwLock::new(ZoneMatrix::default()));
        let merge = reload_matrix(api.as_ref(), scheme_id, &cache, &matrix).await?;

        {
            let m = matrix.read();
            tracing::info!(
                scheme_id,
                zones = m.zone_count(),
                groups = m.groups.len(),
                brackets = merge.map(|r| r.brackets_merged).unwrap_or_default(),
                "Pricing scheme opened"
            );
        }

        Ok(Self {
            api,
            config,
            scheme_id,
            snapshot: RwLock::new(Snapshot { scheme, templates }),
            matrix,
            cache,
            busy: Arc::new(AtomicUsize::new(0)),
            refresh: Mutex::new(None),
        })
    }

    fn fallback_for(scheme: &PricingSchemeDetail, config: &EngineConfig) -> PricingMode {
        scheme
            .default_pricing_mode
            .or(config.default_pricing_mode)
            .unwrap_or(PricingMode::LinearTotal)
    }

    // ========== State ==========

    pub fn scheme_id(&self) -> i64 {
        self.scheme_id
    }

    pub fn scheme(&self) -> PricingSchemeDetail {
        self.snapshot.read().scheme.clone()
    }

    pub fn templates(&self) -> Vec<SegmentTemplate> {
        self.snapshot.read().templates.clone()
    }

    pub fn matrix(&self) -> ZoneMatrix {
        self.matrix.read().clone()
    }

    pub fn cache(&self) -> Arc<Mutex<SchemeCache>> {
        self.cache.clone()
    }

    pub fn fallback_mode(&self) -> PricingMode {
        self.cache.lock().fallback()
    }

    /// True while any mutation is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    /// Start the debounced refresher; events from later mutations feed it
    pub fn spawn_refresher(&self) -> JoinHandle<()> {
        let (refresher, handle) = MatrixRefresher::new(
            self.api.clone(),
            self.scheme_id,
            self.cache.clone(),
            self.matrix.clone(),
            self.config.debounce(),
        );
        if let Some(old) = self.refresh.lock().replace(handle) {
            old.shutdown();
        }
        refresher.spawn()
    }

    pub fn refresh_handle(&self) -> Option<RefreshHandle> {
        self.refresh.lock().clone()
    }

    fn notify(&self, event: ChangeEvent) {
        if let Some(handle) = self.refresh.lock().as_ref() {
            handle.notify(event);
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = ClientResult<T>>) -> EngineResult<T> {
        match tokio::time::timeout(self.config.mutation_timeout(), fut).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => {
                tracing::warn!(
                    scheme_id = self.scheme_id,
                    timeout_ms = self.config.mutation_timeout_ms,
                    "Mutation timed out"
                );
                Err(EngineError::Timeout)
            }
        }
    }

    /// Reload scheme, templates and matrix, merging into the caches
    ///
    /// Returns `None` and leaves every snapshot untouched when a newer reload
    /// was issued while this one was in flight.
    pub async fn reload(&self) -> EngineResult<Option<MergeReport>> {
        let scheme = self.api.scheme_detail(self.scheme_id).await?;
        let templates = self.api.segment_templates(self.scheme_id).await?;
        let merge = reload_matrix(self.api.as_ref(), self.scheme_id, &self.cache, &self.matrix).await?;
        if merge.is_none() {
            return Ok(None);
        }
        self.cache
            .lock()
            .set_fallback(Self::fallback_for(&scheme, &self.config));
        *self.snapshot.write() = Snapshot { scheme, templates };
        Ok(merge)
    }

    // ========== Cells ==========

    /// Segment columns of the template a zone is bound to
    pub fn columns(&self, zone_id: i64) -> EngineResult<Vec<MatrixColumn>> {
        let matrix = self.matrix.read();
        match matrix.group_of(zone_id) {
            Some(group) => Ok(group.columns.clone()),
            None => Err(EngineError::Validation(format!(
                "zone {zone_id} is not bound to a segment template"
            ))),
        }
    }

    fn column(&self, zone_id: i64, key: &CellKey) -> EngineResult<MatrixColumn> {
        self.columns(zone_id)?
            .into_iter()
            .find(|c| c.key == *key)
            .ok_or_else(|| {
                EngineError::Validation(format!("{key} is not a segment of zone {zone_id}"))
            })
    }

    pub fn set_draft(&self, zone_id: i64, key: CellKey, draft: RowDraft) {
        self.cache.lock().edit_draft(zone_id, key, draft);
    }

    pub fn discard_draft(&self, zone_id: i64, key: &CellKey) {
        self.cache.lock().discard_draft(zone_id, key);
    }

    pub fn draft(&self, zone_id: i64, key: &CellKey) -> Option<RowDraft> {
        self.cache.lock().draft(zone_id, key).cloned()
    }

    /// Invalid, orphan and missing keys of a zone
    pub fn zone_diagnostics(&self, zone_id: i64) -> EngineResult<KeyDiagnostics> {
        let keys: Vec<CellKey> = self.columns(zone_id)?.iter().map(|c| c.key).collect();
        let cached: Vec<Bracket> = self
            .cache
            .lock()
            .brackets_of(zone_id)
            .into_iter()
            .cloned()
            .collect();
        let mut diagnostics = diagnose_zone_keys(&keys, &cached);
        let matrix = self.matrix.read();
        if let Some(brackets) = matrix.zone(zone_id).and_then(|z| z.brackets.as_ref()) {
            diagnostics.invalid = brackets
                .iter()
                .filter_map(|b| match key_from_bracket(b) {
                    BracketKey::Invalid { bracket_id } => Some(bracket_id),
                    BracketKey::Cell(_) => None,
                })
                .collect();
        }
        Ok(diagnostics)
    }

    async fn write_cell(
        &self,
        zone_id: i64,
        key: CellKey,
        rule: PricingRule,
    ) -> EngineResult<(Bracket, bool)> {
        let existing = self.cache.lock().bracket_at(zone_id, &key).map(|b| b.id);
        let (saved, created) = match existing {
            Some(bracket_id) => {
                let patch = BracketPatch { rule, active: None };
                (self.bounded(self.api.patch_bracket(bracket_id, &patch)).await?, false)
            }
            None => {
                let create = BracketCreate {
                    min_kg: key.min_kg(),
                    max_kg: key.max_kg(),
                    rule,
                    active: true,
                };
                (self.bounded(self.api.create_bracket(zone_id, &create)).await?, true)
            }
        };
        self.cache.lock().mark_saved(zone_id, key, saved.clone());
        Ok((saved, created))
    }

    /// Validate and persist the draft of one cell
    pub async fn save_cell(&self, zone_id: i64, key: CellKey) -> EngineResult<Bracket> {
        ensure_writable(&self.scheme(), Some(zone_id))?;
        self.column(zone_id, &key)?;
        let rule = {
            let cache = self.cache.lock();
            validate_draft_for_save(cache.draft(zone_id, &key), cache.fallback())?
        };

        let _busy = BusyGuard::enter(&self.busy);
        let (saved, created) = self.write_cell(zone_id, key, rule).await?;
        tracing::info!(zone_id, cell = %key, bracket_id = saved.id, created, "Cell saved");
        self.notify(ChangeEvent::PriceSaved { zone_id });
        Ok(saved)
    }

    /// Persist every column of a zone
    ///
    /// All drafts are validated before the first write. Refused while the zone
    /// has brackets with invalid intervals. A write failing part way returns
    /// [`EngineError::PartialSave`] with the counts of the cells already saved.
    pub async fn save_zone_prices(&self, zone_id: i64) -> EngineResult<ZoneSaveReport> {
        ensure_writable(&self.scheme(), Some(zone_id))?;
        let diagnostics = self.zone_diagnostics(zone_id)?;
        if diagnostics.blocks_save() {
            return Err(EngineError::Validation(format!(
                "zone {zone_id} has {} bracket(s) with invalid intervals; fix them before saving",
                diagnostics.invalid.len()
            )));
        }

        let columns = self.columns(zone_id)?;
        if columns.is_empty() {
            return Err(EngineError::Validation(format!(
                "zone {zone_id} has no active segments"
            )));
        }
        let mut rules = Vec::with_capacity(columns.len());
        {
            let cache = self.cache.lock();
            for column in &columns {
                let rule = validate_draft_for_save(cache.draft(zone_id, &column.key), cache.fallback())
                    .map_err(|e| EngineError::Validation(format!("{}: {e}", column.label)))?;
                rules.push((column, rule));
            }
        }

        let _busy = BusyGuard::enter(&self.busy);
        let mut report = ZoneSaveReport::default();
        for (column, rule) in rules {
            let (_, created) = match self.write_cell(zone_id, column.key, rule).await {
                Ok(written) => written,
                Err(e) => {
                    tracing::warn!(
                        zone_id,
                        cell = %column.key,
                        created = report.created,
                        updated = report.updated,
                        error = %e,
                        "Zone save stopped part way"
                    );
                    if report.created + report.updated > 0 {
                        self.notify(ChangeEvent::PriceSaved { zone_id });
                    }
                    return Err(EngineError::PartialSave {
                        label: column.label.clone(),
                        saved: report,
                        source: Box::new(e),
                    });
                }
            };
            if created {
                report.created += 1;
            } else {
                report.updated += 1;
            }
        }
        tracing::info!(zone_id, created = report.created, updated = report.updated, "Zone prices saved");
        self.notify(ChangeEvent::PriceSaved { zone_id });
        Ok(report)
    }

    /// Delete the bracket of a cell after confirmation
    pub async fn delete_bracket(
        &self,
        zone_id: i64,
        key: CellKey,
        confirmed: bool,
    ) -> EngineResult<Confirmable<Bracket>> {
        ensure_writable(&self.scheme(), Some(zone_id))?;
        let bracket = self
            .cache
            .lock()
            .bracket_at(zone_id, &key)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("bracket {key} of zone {zone_id}")))?;
        if !confirmed {
            return Ok(Confirmable::NeedsConfirmation {
                summary: format!(
                    "delete bracket #{} ({key}, {}) of zone {zone_id}",
                    bracket.id,
                    summarize_bracket(&bracket)
                ),
            });
        }

        let _busy = BusyGuard::enter(&self.busy);
        self.bounded(self.api.delete_bracket(bracket.id)).await?;
        self.cache.lock().remove_bracket(zone_id, bracket.id);
        tracing::info!(zone_id, bracket_id = bracket.id, "Bracket deleted");
        self.notify(ChangeEvent::PriceSaved { zone_id });
        Ok(Confirmable::Done(bracket))
    }

    /// Copy a zone's brackets onto other zones, one target at a time
    ///
    /// Each target gets its own mutation timeout; a stalled target is
    /// reported as failed and the run moves on.
    pub async fn copy_brackets(
        &self,
        source_zone_id: i64,
        targets: &[i64],
        options: &CopyOptions,
    ) -> EngineResult<CopyReport> {
        let scheme = self.scheme();
        ensure_scheme_writable(&scheme)?;
        for target in targets {
            ensure_writable(&scheme, Some(*target))?;
        }

        let mut options = options.clone();
        options
            .target_timeout
            .get_or_insert(self.config.mutation_timeout());

        let _busy = BusyGuard::enter(&self.busy);
        let report = copy_to_targets(self.api.as_ref(), source_zone_id, targets, &options).await?;
        tracing::info!(source_zone_id, summary = %report, "Bulk copy finished");

        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "Reload after copy failed");
        }
        Ok(report)
    }

    // ========== Quotes ==========

    /// Price an order against the scheme with the latest saved brackets
    pub fn quote(&self, request: &QuoteRequest) -> EngineResult<QuoteBreakdown> {
        let (mut scheme, templates) = {
            let snapshot = self.snapshot.read();
            (snapshot.scheme.clone(), snapshot.templates.clone())
        };
        {
            let cache = self.cache.lock();
            for zone in &mut scheme.zones {
                let cached = cache.brackets_of(zone.id);
                if !cached.is_empty() {
                    zone.brackets = Some(cached.into_iter().cloned().collect());
                }
            }
        }
        Ok(compute_quote(&scheme, &templates, request)?)
    }

    // ========== Zones ==========

    /// Create a zone with its provinces in one request
    ///
    /// Provinces held by another live zone are refused before the request.
    pub async fn create_zone(
        &self,
        name: &str,
        provinces: &[String],
        segment_template_id: Option<i64>,
    ) -> EngineResult<Zone> {
        let scheme = self.scheme();
        ensure_scheme_writable(&scheme)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("zone name required".to_string()));
        }
        let provinces = clean_provinces(provinces)?;
        check_occupancy(&scheme.zones, None, &provinces)?;
        if let Some(template_id) = segment_template_id {
            self.ensure_bindable(template_id)?;
        }

        let payload = ZoneCreateAtomic {
            name: name.to_string(),
            active: true,
            segment_template_id,
            provinces,
        };
        let _busy = BusyGuard::enter(&self.busy);
        let zone = self
            .bounded(self.api.create_zone_atomic(self.scheme_id, &payload))
            .await?;
        tracing::info!(zone_id = zone.id, name = %zone.name, "Zone created");
        self.snapshot.write().scheme.zones.push(zone.clone());
        self.notify(ChangeEvent::ZoneChanged { zone_id: zone.id });
        Ok(zone)
    }

    /// Replace a zone's province members
    pub async fn replace_provinces(&self, zone_id: i64, provinces: &[String]) -> EngineResult<Zone> {
        let scheme = self.scheme();
        ensure_writable(&scheme, Some(zone_id))?;
        let provinces = clean_provinces(provinces)?;
        check_occupancy(&scheme.zones, Some(zone_id), &provinces)?;

        let _busy = BusyGuard::enter(&self.busy);
        let zone = self
            .bounded(
                self.api
                    .replace_province_members(zone_id, &ProvinceMembersPut { provinces }),
            )
            .await?;
        self.replace_zone(&zone);
        self.notify(ChangeEvent::ZoneChanged { zone_id });
        Ok(zone)
    }

    /// Bind a zone to a published segment template
    pub async fn bind_template(&self, zone_id: i64, template_id: i64) -> EngineResult<Zone> {
        ensure_writable(&self.scheme(), Some(zone_id))?;
        self.ensure_bindable(template_id)?;
        let update = ZoneUpdate {
            segment_template_id: Some(template_id),
            ..Default::default()
        };

        let _busy = BusyGuard::enter(&self.busy);
        let zone = self.bounded(self.api.patch_zone(zone_id, &update)).await?;
        self.replace_zone(&zone);
        self.notify(ChangeEvent::ZoneChanged { zone_id });
        Ok(zone)
    }

    pub async fn set_zone_active(&self, zone_id: i64, active: bool) -> EngineResult<Zone> {
        let scheme = self.scheme();
        ensure_writable(&scheme, Some(zone_id))?;
        if active && let Some(zone) = scheme.zone(zone_id) {
            let provinces: Vec<String> = zone
                .member_values(MemberLevel::Province)
                .map(str::to_string)
                .collect();
            check_occupancy(&scheme.zones, Some(zone_id), &provinces)?;
        }
        let update = ZoneUpdate {
            active: Some(active),
            ..Default::default()
        };

        let _busy = BusyGuard::enter(&self.busy);
        let zone = self.bounded(self.api.patch_zone(zone_id, &update)).await?;
        self.replace_zone(&zone);
        self.notify(ChangeEvent::ZoneChanged { zone_id });
        Ok(zone)
    }

    fn replace_zone(&self, zone: &Zone) {
        let mut snapshot = self.snapshot.write();
        match snapshot.scheme.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(slot) => {
                let brackets = slot.brackets.take();
                *slot = zone.clone();
                if slot.brackets.is_none() {
                    slot.brackets = brackets;
                }
            }
            None => snapshot.scheme.zones.push(zone.clone()),
        }
    }

    fn ensure_bindable(&self, template_id: i64) -> EngineResult<()> {
        let snapshot = self.snapshot.read();
        let template = snapshot
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| EngineError::NotFound(format!("segment template {template_id}")))?;
        if template.status != TemplateStatus::Published {
            return Err(EngineError::Validation(format!(
                "segment template {template_id} must be published before zones can use it"
            )));
        }
        Ok(())
    }

    // ========== Segment templates ==========

    fn template(&self, template_id: i64) -> EngineResult<SegmentTemplate> {
        self.snapshot
            .read()
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("segment template {template_id}")))
    }

    fn store_template(&self, template: &SegmentTemplate) {
        let mut snapshot = self.snapshot.write();
        match snapshot.templates.iter_mut().find(|t| t.id == template.id) {
            Some(slot) => *slot = template.clone(),
            None => snapshot.templates.push(template.clone()),
        }
    }

    /// Create an empty draft template in this scheme
    pub async fn create_template(&self, name: &str) -> EngineResult<SegmentTemplate> {
        ensure_scheme_writable(&self.scheme())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("template name required".to_string()));
        }
        let payload = SegmentTemplateCreate {
            name: name.to_string(),
        };

        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.create_segment_template(self.scheme_id, &payload))
            .await?;
        tracing::info!(template_id = template.id, name = %template.name, "Segment template created");
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged {
            template_id: template.id,
        });
        Ok(template)
    }

    /// Retire a template no live zone is bound to
    pub async fn archive_template(&self, template_id: i64) -> EngineResult<SegmentTemplate> {
        let scheme = self.scheme();
        ensure_scheme_writable(&scheme)?;
        let template = self.template(template_id)?;
        if template.status == TemplateStatus::Archived {
            return Ok(template);
        }
        let mut bound: Vec<i64> = scheme
            .zones
            .iter()
            .filter(|z| z.is_live() && z.segment_template_id == Some(template_id))
            .map(|z| z.id)
            .collect();
        if !bound.is_empty() {
            bound.sort_unstable();
            let names: Vec<String> = bound.iter().map(|id| format!("#{id}")).collect();
            return Err(EngineError::Validation(format!(
                "segment template {template_id} is used by zone(s) {}; rebind them first",
                names.join(", ")
            )));
        }

        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.archive_segment_template(template_id))
            .await?;
        tracing::info!(template_id, "Segment template archived");
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged { template_id });
        Ok(template)
    }

    /// Replace the items of a draft template with a validated segment list
    pub async fn save_template_items(
        &self,
        template_id: i64,
        rows: &[SegmentDraft],
    ) -> EngineResult<SegmentTemplate> {
        ensure_scheme_writable(&self.scheme())?;
        ensure_items_editable(&self.template(template_id)?)?;
        let items: Vec<TemplateItemInput> = to_weight_segments(rows)?
            .into_iter()
            .enumerate()
            .map(|(i, s)| TemplateItemInput {
                ord: i as i32 + 1,
                min_kg: s.min,
                max_kg: s.max,
                active: true,
            })
            .collect();

        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.put_template_items(template_id, &items))
            .await?;
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged { template_id });
        Ok(template)
    }

    pub async fn publish_template(&self, template_id: i64) -> EngineResult<SegmentTemplate> {
        ensure_scheme_writable(&self.scheme())?;
        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.publish_segment_template(template_id))
            .await?;
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged { template_id });
        Ok(template)
    }

    pub async fn activate_template(&self, template_id: i64) -> EngineResult<SegmentTemplate> {
        ensure_scheme_writable(&self.scheme())?;
        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.activate_segment_template(template_id))
            .await?;
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged { template_id });
        Ok(template)
    }

    /// Toggle one item; the only change a published template accepts
    pub async fn set_template_item_active(
        &self,
        template_id: i64,
        item_id: i64,
        active: bool,
    ) -> EngineResult<SegmentTemplate> {
        ensure_scheme_writable(&self.scheme())?;
        let template = self.template(template_id)?;
        if template.status == TemplateStatus::Archived {
            return Err(EngineError::Archived(format!("segment template {template_id}")));
        }
        if !template.items.iter().any(|i| i.id == item_id) {
            return Err(EngineError::NotFound(format!(
                "item {item_id} of segment template {template_id}"
            )));
        }

        let _busy = BusyGuard::enter(&self.busy);
        let template = self
            .bounded(self.api.patch_template_item_active(item_id, active))
            .await?;
        self.store_template(&template);
        self.notify(ChangeEvent::TemplateChanged { template_id });
        Ok(template)
    }

    // ========== Destination adjustments ==========

    fn adjustment(&self, adjustment_id: i64) -> EngineResult<DestAdjustment> {
        self.snapshot
            .read()
            .scheme
            .dest_adjustments
            .iter()
            .find(|a| a.id == adjustment_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("destination adjustment {adjustment_id}")))
    }

    fn ensure_inactive(adjustment: &DestAdjustment) -> EngineResult<()> {
        if adjustment.active {
            return Err(EngineError::Validation(format!(
                "adjustment #{} ({}) is active; deactivate it first",
                adjustment.id,
                adjustment.label()
            )));
        }
        Ok(())
    }

    fn store_adjustment(&self, adjustment: &DestAdjustment) {
        let mut snapshot = self.snapshot.write();
        let list = &mut snapshot.scheme.dest_adjustments;
        match list.iter_mut().find(|a| a.id == adjustment.id) {
            Some(slot) => *slot = adjustment.clone(),
            None => list.push(adjustment.clone()),
        }
    }

    /// Create or edit the adjustment of a destination
    ///
    /// Editing an existing active adjustment is refused; province/city
    /// conflicts come back from the backend as [`EngineError::Conflict`].
    pub async fn upsert_dest_adjustment(
        &self,
        payload: &DestAdjustmentUpsert,
    ) -> EngineResult<DestAdjustment> {
        let scheme = self.scheme();
        ensure_scheme_writable(&scheme)?;
        if payload.province_code.trim().is_empty() {
            return Err(EngineError::Validation("province required".to_string()));
        }
        let city = payload.city_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
        if payload.scope == AdjustmentScope::City && city.is_none() {
            return Err(EngineError::Validation(
                "city required for a city-scope adjustment".to_string(),
            ));
        }
        if let Some(existing) = scheme.dest_adjustments.iter().find(|a| {
            a.scope == payload.scope
                && a.province_code == payload.province_code
                && (payload.scope == AdjustmentScope::Province || a.city_code.as_deref() == city)
        }) {
            Self::ensure_inactive(existing)?;
        }

        let _busy = BusyGuard::enter(&self.busy);
        let saved = self
            .bounded(self.api.upsert_dest_adjustment(self.scheme_id, payload))
            .await?;
        tracing::info!(adjustment_id = saved.id, label = %saved.label(), "Destination adjustment saved");
        self.store_adjustment(&saved);
        self.notify(ChangeEvent::AdjustmentChanged);
        Ok(saved)
    }

    pub async fn set_dest_adjustment_active(
        &self,
        adjustment_id: i64,
        active: bool,
    ) -> EngineResult<DestAdjustment> {
        ensure_scheme_writable(&self.scheme())?;
        self.adjustment(adjustment_id)?;
        let update = DestAdjustmentUpdate {
            active: Some(active),
            ..Default::default()
        };

        let _busy = BusyGuard::enter(&self.busy);
        let saved = self
            .bounded(self.api.patch_dest_adjustment(adjustment_id, &update))
            .await?;
        self.store_adjustment(&saved);
        self.notify(ChangeEvent::AdjustmentChanged);
        Ok(saved)
    }

    /// Change amount or priority of an inactive adjustment
    pub async fn update_dest_adjustment(
        &self,
        adjustment_id: i64,
        amount: Option<Decimal>,
        priority: Option<i32>,
    ) -> EngineResult<DestAdjustment> {
        ensure_scheme_writable(&self.scheme())?;
        Self::ensure_inactive(&self.adjustment(adjustment_id)?)?;
        let update = DestAdjustmentUpdate {
            active: None,
            amount,
            priority,
        };

        let _busy = BusyGuard::enter(&self.busy);
        let saved = self
            .bounded(self.api.patch_dest_adjustment(adjustment_id, &update))
            .await?;
        self.store_adjustment(&saved);
        self.notify(ChangeEvent::AdjustmentChanged);
        Ok(saved)
    }

    pub async fn delete_dest_adjustment(
        &self,
        adjustment_id: i64,
        confirmed: bool,
    ) -> EngineResult<Confirmable<DestAdjustment>> {
        ensure_scheme_writable(&self.scheme())?;
        let adjustment = self.adjustment(adjustment_id)?;
        Self::ensure_inactive(&adjustment)?;
        if !confirmed {
            return Ok(Confirmable::NeedsConfirmation {
                summary: format!(
                    "delete adjustment #{} ({}, {})",
                    adjustment.id,
                    adjustment.label(),
                    format_money(adjustment.amount)
                ),
            });
        }

        let _busy = BusyGuard::enter(&self.busy);
        self.bounded(self.api.delete_dest_adjustment(adjustment_id))
            .await?;
        self.snapshot
            .write()
            .scheme
            .dest_adjustments
            .retain(|a| a.id != adjustment_id);
        self.notify(ChangeEvent::AdjustmentChanged);
        Ok(Confirmable::Done(adjustment))
    }

    // ========== Surcharges ==========

    /// Set the flat fee charged to orders flagged `bulky`
    pub async fn set_bulky_fee(&self, amount: Decimal) -> EngineResult<Surcharge> {
        ensure_scheme_writable(&self.scheme())?;
        if amount < Decimal::ZERO {
            return Err(EngineError::Validation(
                "bulky fee must be a number ≥ 0".to_string(),
            ));
        }
        let existing = self
            .snapshot
            .read()
            .scheme
            .surcharges
            .iter()
            .find(|s| s.condition_json.flag_any.iter().any(|f| f == BULKY_FLAG))
            .map(|s| s.id);

        let _busy = BusyGuard::enter(&self.busy);
        let saved = match existing {
            Some(id) => {
                let update = SurchargeUpdate {
                    active: Some(true),
                    amount_json: Some(SurchargeAmount::Flat { amount }),
                    ..Default::default()
                };
                self.bounded(self.api.patch_surcharge(id, &update)).await?
            }
            None => {
                self.bounded(
                    self.api
                        .create_surcharge(self.scheme_id, &SurchargeCreate::bulky_fee(amount)),
                )
                .await?
            }
        };
        let mut snapshot = self.snapshot.write();
        let list = &mut snapshot.scheme.surcharges;
        match list.iter_mut().find(|s| s.id == saved.id) {
            Some(slot) => *slot = saved.clone(),
            None => list.push(saved.clone()),
        }
        Ok(saved)
    }
}

impl<A: ?Sized> Drop for PricingWorkbench<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh.lock().take() {
            handle.shutdown();
        }
    }
}

fn clean_provinces(provinces: &[String]) -> EngineResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(provinces.len());
    for p in provinces {
        let p = p.trim();
        if !p.is_empty() && !out.iter().any(|x| x == p) {
            out.push(p.to_string());
        }
    }
    if out.is_empty() {
        return Err(EngineError::Validation(
            "select at least one province".to_string(),
        ));
    }
    Ok(out)
}

fn check_occupancy(zones: &[Zone], editing_zone_id: Option<i64>, provinces: &[String]) -> EngineResult<()> {
    let occupancy = build_province_occupancy(zones, editing_zone_id);
    let conflicts = occupancy.conflicts(provinces);
    if conflicts.is_empty() {
        return Ok(());
    }
    let mut ids: Vec<i64> = conflicts.iter().map(|(_, o)| o.zone_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let message = conflicts
        .iter()
        .map(|(p, o)| format!("{p} is in zone {}", o.zone_name))
        .collect::<Vec<_>>()
        .join(", ");
    Err(EngineError::Conflict {
        code: Some("province_occupied".to_string()),
        ids,
        message,
    })
}
