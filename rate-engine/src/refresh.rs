//! Debounced matrix refresh
//!
//! Change events arriving within the debounce window collapse into one
//! reload. Each reload is numbered through [`SchemeCache::begin_request`]
//! and its response is merged, and its matrix published to the shared
//! [`MatrixSlot`], only if no newer reload was issued meanwhile.
//! Cancelling the shutdown token drops any pending reload.

use crate::error::EngineResult;
use crate::matrix::{ZoneMatrix, matrix_from_wire};
use crate::reconcile::{MergeReport, SchemeCache};
use parking_lot::{Mutex, RwLock};
use rate_client::RateApi;
use shared::models::ZoneBracketsMatrixOut;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Matrix shared by the workbench and its refresher
pub type MatrixSlot = Arc<RwLock<ZoneMatrix>>;

/// Default coalescing window
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// A fact that makes the cached matrix stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    PriceSaved { zone_id: i64 },
    ZoneChanged { zone_id: i64 },
    TemplateChanged { template_id: i64 },
    AdjustmentChanged,
    Reload,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub reloads: u64,
    /// Unix millis of the last finished reload
    pub last_reload_at: Option<i64>,
    pub last_merge: Option<MergeReport>,
    /// Reloads whose response arrived after a newer one was issued
    pub stale_dropped: u64,
    pub last_error: Option<String>,
}

/// Merge and publish the response of request `seq` if it is still the latest
///
/// The cache lock is held across the check and the publish, so a stale
/// response can never replace a newer matrix.
pub fn publish_if_latest(
    cache: &Mutex<SchemeCache>,
    slot: &RwLock<ZoneMatrix>,
    seq: u64,
    out: &ZoneBracketsMatrixOut,
) -> Option<MergeReport> {
    let zones: Vec<_> = out.all_zones().cloned().collect();
    let mut cache = cache.lock();
    let merge = cache.apply_if_latest(seq, &zones)?;
    *slot.write() = matrix_from_wire(out);
    Some(merge)
}

/// Fetch the matrix once; `None` when the response was stale and dropped
pub async fn reload_matrix<A>(
    api: &A,
    scheme_id: i64,
    cache: &Mutex<SchemeCache>,
    slot: &RwLock<ZoneMatrix>,
) -> EngineResult<Option<MergeReport>>
where
    A: RateApi + ?Sized,
{
    let seq = cache.lock().begin_request();
    let out = api.zone_brackets_matrix(scheme_id).await?;
    Ok(publish_if_latest(cache, slot, seq, &out))
}

/// Sender side held by whoever produces change events
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    shutdown: CancellationToken,
    state: watch::Receiver<RefreshState>,
}

impl RefreshHandle {
    pub fn notify(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(?event, "Refresher already stopped");
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn state(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.clone()
    }
}

pub struct MatrixRefresher<A: ?Sized> {
    api: Arc<A>,
    scheme_id: i64,
    cache: Arc<Mutex<SchemeCache>>,
    matrix: MatrixSlot,
    debounce: Duration,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    shutdown: CancellationToken,
    state: watch::Sender<RefreshState>,
}

impl<A> MatrixRefresher<A>
where
    A: RateApi + ?Sized + 'static,
{
    pub fn new(
        api: Arc<A>,
        scheme_id: i64,
        cache: Arc<Mutex<SchemeCache>>,
        matrix: MatrixSlot,
        debounce: Duration,
    ) -> (Self, RefreshHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RefreshState::default());
        let shutdown = CancellationToken::new();
        let handle = RefreshHandle {
            tx,
            shutdown: shutdown.clone(),
            state: state_rx,
        };
        let refresher = Self {
            api,
            scheme_id,
            cache,
            matrix,
            debounce,
            rx,
            shutdown,
            state: state_tx,
        };
        (refresher, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::info!(scheme_id = self.scheme_id, "MatrixRefresher started");
        let mut debounce_deadline: Option<Instant> = None;
        let mut coalesced = 0usize;

        loop {
            let sleep_until =
                debounce_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if debounce_deadline.is_some() {
                        tracing::debug!(pending = coalesced, "Dropping pending reload on shutdown");
                    }
                    break;
                }

                _ = tokio::time::sleep_until(sleep_until), if debounce_deadline.is_some() => {
                    debounce_deadline = None;
                    tracing::debug!(events = coalesced, "Debounce window elapsed, reloading");
                    coalesced = 0;
                    self.reload().await;
                }

                event = self.rx.recv() => {
                    match event {
                        Some(event) => {
                            tracing::trace!(?event, "Change event");
                            coalesced += 1;
                            debounce_deadline = Some(Instant::now() + self.debounce);
                        }
                        None => {
                            tracing::info!("All refresh handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(scheme_id = self.scheme_id, "MatrixRefresher stopped");
    }

    async fn reload(&self) {
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            r = reload_matrix(self.api.as_ref(), self.scheme_id, &self.cache, &self.matrix) => r,
        };
        self.state.send_modify(|state| {
            state.reloads += 1;
            state.last_reload_at = Some(shared::util::now_millis());
            match result {
                Ok(Some(merge)) => {
                    state.last_merge = Some(merge);
                    state.last_error = None;
                }
                Ok(None) => {
                    state.stale_dropped += 1;
                    state.last_error = None;
                }
                Err(e) => {
                    tracing::error!(scheme_id = self.scheme_id, error = %e, "Matrix reload failed");
                    state.last_error = Some(e.user_message());
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{PricingMode, Zone};

    fn zone(id: i64) -> Zone {
        Zone {
            id,
            scheme_id: 1,
            name: format!("zone-{id}"),
            active: true,
            archived_at: None,
            segment_template_id: None,
            members: vec![],
            brackets: Some(vec![]),
        }
    }

    fn out(ids: &[i64]) -> ZoneBracketsMatrixOut {
        ZoneBracketsMatrixOut {
            groups: vec![],
            unbound_zones: ids.iter().map(|id| zone(*id)).collect(),
        }
    }

    #[test]
    fn test_late_stale_response_keeps_newer_matrix() {
        let cache = Mutex::new(SchemeCache::new(1, PricingMode::Flat));
        let slot = RwLock::new(ZoneMatrix::default());
        let older = cache.lock().begin_request();
        let newer = cache.lock().begin_request();

        assert!(publish_if_latest(&cache, &slot, newer, &out(&[5, 6])).is_some());
        assert!(publish_if_latest(&cache, &slot, older, &out(&[5])).is_none());

        assert_eq!(slot.read().zone_count(), 2);
        assert!(slot.read().zone(6).is_some());
    }

    #[test]
    fn test_superseded_response_is_not_published() {
        let cache = Mutex::new(SchemeCache::new(1, PricingMode::Flat));
        let slot = RwLock::new(ZoneMatrix::default());
        let first = cache.lock().begin_request();
        cache.lock().begin_request();

        assert!(publish_if_latest(&cache, &slot, first, &out(&[5])).is_none());
        assert_eq!(slot.read().zone_count(), 0);
    }
}
