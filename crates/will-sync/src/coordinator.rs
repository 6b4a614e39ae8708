//! SyncCoordinator decides when buffered taps are reconciled and performs
//! the batched, idempotent merge with the remote counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tracing::Instrument;

use will_core::config::SyncConfig;
use will_core::errors::SyncError;
use will_core::models::{
    AttemptStatus, InFlightSync, RemoteCounterRecord, SkipReason, Stored, SyncAttempt,
    SyncOutcome, SyncState,
};
use will_core::traits::{IOfflineStore, IRemoteCounter, ISessionProvider};

use crate::connectivity::ConnectivityMonitor;

/// Held while a sync runs. Dropping it reopens the gate and returns the
/// coordinator to `Idle`.
struct InFlightGuard<'a> {
    coordinator: &'a SyncCoordinator,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.transition(SyncState::Syncing, SyncState::Idle);
        self.coordinator.in_flight.store(false, Ordering::Release);
    }
}

/// Orchestrates reconciliation for one app session.
pub struct SyncCoordinator {
    pub(crate) store: Arc<dyn IOfflineStore>,
    pub(crate) remote: Arc<dyn IRemoteCounter>,
    pub(crate) session: Arc<dyn ISessionProvider>,
    pub(crate) connectivity: ConnectivityMonitor,
    pub(crate) config: SyncConfig,
    in_flight: AtomicBool,
    state: Mutex<SyncState>,
    last_record: Mutex<Option<RemoteCounterRecord>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn IOfflineStore>,
        remote: Arc<dyn IRemoteCounter>,
        session: Arc<dyn ISessionProvider>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            session,
            connectivity,
            config,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SyncState::Idle),
            last_record: Mutex::new(None),
        }
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn transition(&self, from: SyncState, to: SyncState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == from {
            *state = to;
        }
    }

    /// Last counter record the server returned, if any.
    pub fn last_record(&self) -> Option<RemoteCounterRecord> {
        self.last_record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn remember_record(&self, record: RemoteCounterRecord) {
        *self
            .last_record
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(record);
    }

    /// Taps buffered locally and not yet confirmed by the server.
    pub async fn pending_count(&self) -> Stored<u64> {
        self.store.get_increment_count().await
    }

    pub async fn is_offline(&self) -> Stored<bool> {
        self.store.is_offline_mode().await
    }

    /// What the user should see: last known remote count plus local pending.
    pub async fn perceived_count(&self) -> u64 {
        let remote = self.last_record().map_or(0, |r| r.count);
        remote + self.pending_count().await.or_default()
    }

    /// Admission check against the configured cooldown.
    pub async fn should_sync(&self) -> bool {
        self.store
            .should_sync_at(Utc::now(), self.config.cooldown())
            .await
    }

    fn try_claim(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { coordinator: self })
    }

    /// Reconcile everything buffered in one remote call.
    ///
    /// No-op without a signed-in user, while another sync is running, or with
    /// nothing pending. On failure the buffer, the sealed batch, and the
    /// last-sync time are left as they were.
    pub async fn sync_offline_data(&self) -> SyncOutcome {
        self.sync_inner()
            .instrument(will_observability::sync_span!("sync_offline_data"))
            .await
    }

    async fn sync_inner(&self) -> SyncOutcome {
        let Some(user) = self.session.current_user() else {
            tracing::debug!("sync: skipped, no signed-in user");
            return SyncOutcome::Skipped(SkipReason::NoUser);
        };
        let Some(_guard) = self.try_claim() else {
            tracing::debug!("sync: skipped, already in flight");
            return SyncOutcome::Skipped(SkipReason::InFlight);
        };

        let pending = match self.store.get_increment_count().await {
            Stored::Value(total) => total,
            Stored::Unavailable { reason } => {
                tracing::warn!("sync: skipped, buffer unreadable: {reason}");
                return SyncOutcome::Skipped(SkipReason::StorageUnavailable);
            }
        };
        let sealed = match self.store.in_flight().await {
            Stored::Value(sealed) => sealed,
            Stored::Unavailable { reason } => {
                tracing::warn!("sync: skipped, sealed batch unreadable: {reason}");
                return SyncOutcome::Skipped(SkipReason::StorageUnavailable);
            }
        };

        if pending == 0 {
            if sealed.is_some() {
                // Buffer was cleared under a sealed batch; nothing left to settle.
                if let Err(e) = self.store.abandon_sync().await {
                    tracing::warn!("sync: failed to drop stale batch: {e}");
                }
            }
            tracing::debug!("sync: skipped, nothing pending");
            return SyncOutcome::Skipped(SkipReason::NothingPending);
        }

        let sealed = match sealed {
            Some(batch) if batch.count > pending => {
                // The buffer was reset under this batch; it no longer describes
                // what is buffered.
                tracing::warn!(
                    key = %batch.idempotency_key,
                    sealed = batch.count,
                    pending,
                    "sync: dropping sealed batch larger than the buffer"
                );
                if let Err(e) = self.store.abandon_sync().await {
                    tracing::warn!("sync: skipped, could not drop stale batch: {e}");
                    return SyncOutcome::Skipped(SkipReason::StorageUnavailable);
                }
                None
            }
            sealed => sealed,
        };

        let batch = match sealed {
            Some(batch) => {
                tracing::info!(
                    key = %batch.idempotency_key,
                    count = batch.count,
                    "sync: resending sealed batch"
                );
                batch
            }
            None => {
                let batch = InFlightSync::seal(pending);
                if let Err(e) = self.store.begin_sync(&batch).await {
                    tracing::warn!("sync: skipped, could not seal batch: {e}");
                    return SyncOutcome::Skipped(SkipReason::StorageUnavailable);
                }
                batch
            }
        };

        self.set_state(SyncState::Syncing);
        let call = self
            .remote
            .apply_offline_increments(&user, batch.count, batch.idempotency_key);
        let result = match tokio::time::timeout(self.config.request_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                after_ms: self.config.request_timeout().as_millis() as u64,
            }
            .into()),
        };

        match result {
            Ok(record) => self.on_synced(&batch, record).await,
            Err(e) => {
                tracing::warn!(
                    key = %batch.idempotency_key,
                    count = batch.count,
                    "sync: failed, keeping buffer: {e}"
                );
                self.journal(&batch, AttemptStatus::Failed, e.to_string()).await;
                SyncOutcome::Failed {
                    reason: e.to_string(),
                    retained: pending,
                }
            }
        }
    }

    async fn on_synced(&self, batch: &InFlightSync, record: RemoteCounterRecord) -> SyncOutcome {
        self.journal(batch, AttemptStatus::Synced, format!("count={}", record.count))
            .await;
        match self.store.complete_sync(batch).await {
            Ok(remaining) => {
                if let Err(e) = self.store.set_last_sync_time(Utc::now()).await {
                    tracing::warn!("sync: failed to stamp last sync: {e}");
                }
                if let Err(e) = self.store.set_offline_mode(false).await {
                    tracing::warn!("sync: failed to clear offline flag: {e}");
                }
                tracing::info!(
                    applied = batch.count,
                    remaining,
                    count = record.count,
                    "sync: reconciled offline taps"
                );
                self.remember_record(record.clone());
            }
            // The batch is still buffered and sealed, so the record is not
            // cached: it already counts those taps. The next attempt resends
            // the same key and settles once the server confirms it again.
            Err(e) => tracing::error!("sync: server applied batch but local settle failed: {e}"),
        }
        SyncOutcome::Synced {
            applied: batch.count,
            record,
        }
    }

    async fn journal(&self, batch: &InFlightSync, status: AttemptStatus, details: String) {
        let attempt = SyncAttempt {
            attempted_at: Utc::now(),
            idempotency_key: batch.idempotency_key,
            count: batch.count,
            status,
            details,
        };
        if let Err(e) = self.store.record_attempt(&attempt).await {
            tracing::warn!("sync: failed to journal attempt: {e}");
        }
    }

    /// React to a connectivity transition.
    ///
    /// The offline flag is persisted either way. On reconnect, an admitted sync
    /// waits for the stabilization delay and runs only if the link is still up.
    pub async fn on_connectivity_change(&self, connected: bool) -> SyncOutcome {
        if let Err(e) = self.store.set_offline_mode(!connected).await {
            tracing::warn!("sync: failed to persist offline flag: {e}");
        }
        if !connected {
            tracing::info!("sync: went offline, buffering taps");
            return SyncOutcome::Skipped(SkipReason::Offline);
        }
        if !self.should_sync().await {
            tracing::debug!("sync: reconnected, nothing admitted");
            return SyncOutcome::Skipped(SkipReason::NotAdmitted);
        }

        self.transition(SyncState::Idle, SyncState::AwaitingStabilization);
        tokio::time::sleep(self.config.stabilization_delay()).await;
        self.transition(SyncState::AwaitingStabilization, SyncState::Idle);
        if !self.connectivity.is_connected() {
            tracing::debug!("sync: connection dropped during stabilization");
            return SyncOutcome::Skipped(SkipReason::Offline);
        }
        self.sync_inner()
            .instrument(will_observability::sync_span!("reconnect"))
            .await
    }

    /// App start: sync at once if connected and admitted.
    pub async fn on_start(&self) -> SyncOutcome {
        let connected = self.connectivity.is_connected();
        if let Err(e) = self.store.set_offline_mode(!connected).await {
            tracing::warn!("sync: failed to persist offline flag: {e}");
        }
        if !connected {
            return SyncOutcome::Skipped(SkipReason::Offline);
        }
        if !self.should_sync().await {
            return SyncOutcome::Skipped(SkipReason::NotAdmitted);
        }
        self.sync_inner()
            .instrument(will_observability::sync_span!("start"))
            .await
    }

    /// Event loop: start-up check, then connectivity changes and a periodic
    /// admission re-check until `shutdown` flips or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut changes = self.connectivity.subscribe();
        changes.borrow_and_update();

        let outcome = self.on_start().await;
        tracing::debug!(?outcome, "sync: start-up check");

        let mut recheck = tokio::time::interval(self.config.recheck_interval());
        recheck.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        recheck.tick().await;

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let connected = *changes.borrow_and_update();
                    let outcome = self.on_connectivity_change(connected).await;
                    tracing::debug!(?outcome, connected, "sync: connectivity handled");
                }
                _ = recheck.tick() => {
                    if self.connectivity.is_connected() && self.should_sync().await {
                        let outcome = self
                            .sync_inner()
                            .instrument(will_observability::sync_span!("recheck"))
                            .await;
                        tracing::debug!(?outcome, "sync: periodic re-check");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("sync: coordinator stopped");
    }
}
