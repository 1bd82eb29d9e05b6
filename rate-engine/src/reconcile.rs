//! Bracket and draft caches of one pricing scheme
//!
//! Backend snapshots are merged with [`SchemeCache::apply_zones`]:
//! - a zone whose `brackets` is `None` was sent without them and is left alone
//! - brackets are unioned by id, fresh ids added and known ids overwritten
//! - every bracket yields a derived draft, except where the user holds an
//!   unsaved edit for the same cell
//! - brackets without a valid key touch neither cache
//!
//! Applying the same snapshot twice leaves the caches as applying it once.

use crate::keys::{BracketKey, CellKey, key_from_bracket};
use crate::pricing::{RowDraft, draft_from_bracket};
use parking_lot::Mutex;
use shared::models::{Bracket, PricingMode, Zone};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Counters of one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub zones_merged: usize,
    /// Zones sent without a `brackets` field
    pub zones_untouched: usize,
    pub brackets_merged: usize,
    pub invalid_skipped: usize,
    /// Derived drafts not applied because an unsaved edit exists
    pub drafts_kept: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemeCache {
    scheme_id: i64,
    fallback: PricingMode,
    brackets: HashMap<i64, BTreeMap<i64, Bracket>>,
    drafts: HashMap<i64, BTreeMap<CellKey, RowDraft>>,
    dirty: HashMap<i64, BTreeSet<CellKey>>,
    issued_seq: u64,
    applied_seq: u64,
}

impl SchemeCache {
    pub fn new(scheme_id: i64, fallback: PricingMode) -> Self {
        Self {
            scheme_id,
            fallback,
            brackets: HashMap::new(),
            drafts: HashMap::new(),
            dirty: HashMap::new(),
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    pub fn scheme_id(&self) -> i64 {
        self.scheme_id
    }

    pub fn fallback(&self) -> PricingMode {
        self.fallback
    }

    pub fn set_fallback(&mut self, fallback: PricingMode) {
        self.fallback = fallback;
    }

    // ========== Merge ==========

    pub fn apply_zones(&mut self, zones: &[Zone]) -> MergeReport {
        let mut report = MergeReport::default();
        for zone in zones {
            let Some(brackets) = &zone.brackets else {
                report.zones_untouched += 1;
                continue;
            };
            report.zones_merged += 1;
            for bracket in brackets {
                self.merge_bracket(zone.id, bracket, &mut report);
            }
        }
        tracing::debug!(
            scheme_id = self.scheme_id,
            merged = report.zones_merged,
            untouched = report.zones_untouched,
            brackets = report.brackets_merged,
            invalid = report.invalid_skipped,
            kept = report.drafts_kept,
            "Merged backend snapshot"
        );
        report
    }

    fn merge_bracket(&mut self, zone_id: i64, bracket: &Bracket, report: &mut MergeReport) {
        let key = match key_from_bracket(bracket) {
            BracketKey::Cell(key) => key,
            BracketKey::Invalid { bracket_id } => {
                tracing::warn!(zone_id, bracket_id, "Skipping bracket with invalid interval");
                report.invalid_skipped += 1;
                return;
            }
        };
        self.brackets
            .entry(zone_id)
            .or_default()
            .insert(bracket.id, bracket.clone());
        report.brackets_merged += 1;

        if self.is_dirty(zone_id, &key) {
            report.drafts_kept += 1;
            return;
        }
        self.drafts
            .entry(zone_id)
            .or_default()
            .insert(key, draft_from_bracket(bracket, self.fallback));
    }

    // ========== Request sequencing ==========

    /// Number the next reload; only the latest number may be applied
    pub fn begin_request(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    pub fn latest_request(&self) -> u64 {
        self.issued_seq
    }

    /// Merge the response of request `seq` unless a newer one was issued
    pub fn apply_if_latest(&mut self, seq: u64, zones: &[Zone]) -> Option<MergeReport> {
        if seq != self.issued_seq || seq <= self.applied_seq {
            tracing::warn!(
                scheme_id = self.scheme_id,
                seq,
                latest = self.issued_seq,
                "Dropping stale snapshot"
            );
            return None;
        }
        self.applied_seq = seq;
        Some(self.apply_zones(zones))
    }

    // ========== Local edits ==========

    pub fn edit_draft(&mut self, zone_id: i64, key: CellKey, draft: RowDraft) {
        self.drafts.entry(zone_id).or_default().insert(key, draft);
        self.dirty.entry(zone_id).or_default().insert(key);
    }

    /// Drop an unsaved edit, falling back to the backend's view of the cell
    pub fn discard_draft(&mut self, zone_id: i64, key: &CellKey) {
        if let Some(keys) = self.dirty.get_mut(&zone_id) {
            keys.remove(key);
        }
        let derived = self
            .bracket_at(zone_id, key)
            .map(|b| draft_from_bracket(b, self.fallback));
        let drafts = self.drafts.entry(zone_id).or_default();
        match derived {
            Some(draft) => {
                drafts.insert(*key, draft);
            }
            None => {
                drafts.remove(key);
            }
        }
    }

    /// Record a successful write; the saved record replaces the edit
    pub fn mark_saved(&mut self, zone_id: i64, key: CellKey, bracket: Bracket) {
        if let Some(keys) = self.dirty.get_mut(&zone_id) {
            keys.remove(&key);
        }
        let draft = draft_from_bracket(&bracket, self.fallback);
        let zone = self.brackets.entry(zone_id).or_default();
        zone.retain(|id, b| *id == bracket.id || key_from_bracket(b).cell() != Some(key));
        zone.insert(bracket.id, bracket);
        self.drafts.entry(zone_id).or_default().insert(key, draft);
    }

    pub fn remove_bracket(&mut self, zone_id: i64, bracket_id: i64) -> Option<Bracket> {
        let removed = self.brackets.get_mut(&zone_id)?.remove(&bracket_id)?;
        if let Some(key) = key_from_bracket(&removed).cell()
            && !self.is_dirty(zone_id, &key)
            && let Some(drafts) = self.drafts.get_mut(&zone_id)
        {
            drafts.remove(&key);
        }
        Some(removed)
    }

    // ========== Queries ==========

    pub fn brackets_of(&self, zone_id: i64) -> Vec<&Bracket> {
        self.brackets
            .get(&zone_id)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    /// Newest bracket of the cell
    pub fn bracket_at(&self, zone_id: i64, key: &CellKey) -> Option<&Bracket> {
        self.brackets
            .get(&zone_id)?
            .values()
            .rev()
            .find(|b| key_from_bracket(b).cell().as_ref() == Some(key))
    }

    pub fn draft(&self, zone_id: i64, key: &CellKey) -> Option<&RowDraft> {
        self.drafts.get(&zone_id)?.get(key)
    }

    pub fn drafts_of(&self, zone_id: i64) -> Option<&BTreeMap<CellKey, RowDraft>> {
        self.drafts.get(&zone_id)
    }

    pub fn is_dirty(&self, zone_id: i64, key: &CellKey) -> bool {
        self.dirty.get(&zone_id).is_some_and(|k| k.contains(key))
    }

    pub fn dirty_keys(&self, zone_id: i64) -> Vec<CellKey> {
        self.dirty
            .get(&zone_id)
            .map(|k| k.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_unsaved(&self) -> bool {
        self.dirty.values().any(|k| !k.is_empty())
    }
}

/// Caches keyed by scheme id; schemes never share state
#[derive(Debug, Default)]
pub struct CacheRegistry {
    caches: Mutex<HashMap<i64, Arc<Mutex<SchemeCache>>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self, scheme_id: i64, fallback: PricingMode) -> Arc<Mutex<SchemeCache>> {
        self.caches
            .lock()
            .entry(scheme_id)
            .or_insert_with(|| Arc::new(Mutex::new(SchemeCache::new(scheme_id, fallback))))
            .clone()
    }

    pub fn evict(&self, scheme_id: i64) -> bool {
        self.caches.lock().remove(&scheme_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }
}
