//! SyncCoordinator integration tests against the real store and a scripted
//! remote.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use test_fixtures::{MockRemoteCounter, Scripted};
use will_core::config::SyncConfig;
use will_core::errors::{StorageError, WillResult};
use will_core::models::{
    AttemptStatus, InFlightSync, PendingIncrement, SkipReason, Stored, SyncAttempt, SyncOutcome,
    SyncState, UserId,
};
use will_core::traits::{IOfflineStore, ISessionProvider};
use will_storage::OfflineStore;
use will_sync::{ConnectivityMonitor, StaticSession, SyncCoordinator};

struct Harness {
    store: Arc<OfflineStore>,
    remote: Arc<MockRemoteCounter>,
    session: Arc<StaticSession>,
    coordinator: Arc<SyncCoordinator>,
}

fn user() -> UserId {
    UserId::from("u1")
}

fn harness(connected: bool, remote: MockRemoteCounter) -> Harness {
    let store = Arc::new(OfflineStore::open_in_memory().unwrap());
    let remote = Arc::new(remote);
    let session = Arc::new(StaticSession::signed_in(user()));
    let coordinator = Arc::new(SyncCoordinator::new(
        store.clone(),
        remote.clone(),
        session.clone(),
        ConnectivityMonitor::new(connected),
        SyncConfig::default(),
    ));
    Harness {
        store,
        remote,
        session,
        coordinator,
    }
}

async fn tap(store: &OfflineStore, count: u32) {
    store
        .store_increment(PendingIncrement::new(count).unwrap())
        .await
        .unwrap();
}

// ─── sync_offline_data ─────────────────────────────────────

#[tokio::test]
async fn successful_sync_clears_buffer_and_stamps_last_sync() {
    let h = harness(true, MockRemoteCounter::new());
    h.remote.seed(&user(), 10);
    tap(&h.store, 1).await;
    tap(&h.store, 2).await;

    let outcome = h.coordinator.sync_offline_data().await;
    match outcome {
        SyncOutcome::Synced { applied, record } => {
            assert_eq!(applied, 3);
            assert_eq!(record.count, 13);
        }
        other => panic!("expected Synced, got {other:?}"),
    }

    assert_eq!(h.coordinator.pending_count().await, Stored::Value(0));
    assert!(h.store.get_last_sync_time().await.or_default().is_some());
    assert!(!h.coordinator.should_sync().await);
    assert_eq!(h.store.in_flight().await, Stored::Value(None));
    assert_eq!(h.coordinator.last_record().unwrap().count, 13);
    assert_eq!(h.coordinator.perceived_count().await, 13);
    assert_eq!(h.store.attempt_count(AttemptStatus::Synced).await.unwrap(), 1);
    assert_eq!(h.coordinator.state(), SyncState::Idle);
}

#[tokio::test]
async fn failed_sync_retains_buffer_and_last_sync() {
    let h = harness(true, MockRemoteCounter::with_script([Scripted::NetworkError]));
    for _ in 0..3 {
        tap(&h.store, 1).await;
    }

    let outcome = h.coordinator.sync_offline_data().await;
    assert!(
        matches!(outcome, SyncOutcome::Failed { retained: 3, .. }),
        "{outcome:?}"
    );
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(3));
    assert_eq!(h.store.get_last_sync_time().await, Stored::Value(None));
    assert!(h.store.in_flight().await.or_default().is_some());
    assert_eq!(h.store.attempt_count(AttemptStatus::Failed).await.unwrap(), 1);
    assert!(h.coordinator.should_sync().await);
    assert_eq!(h.coordinator.perceived_count().await, 3);
}

#[tokio::test]
async fn retry_after_lost_ack_reuses_key_and_applies_once() {
    let h = harness(true, MockRemoteCounter::with_script([Scripted::LoseAck]));
    tap(&h.store, 2).await;
    tap(&h.store, 1).await;

    assert!(matches!(
        h.coordinator.sync_offline_data().await,
        SyncOutcome::Failed { .. }
    ));
    // The server has it, the client does not know yet.
    assert_eq!(h.remote.server_count(&user()), 3);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(3));

    let outcome = h.coordinator.sync_offline_data().await;
    assert!(outcome.is_synced(), "{outcome:?}");

    let calls = h.remote.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].idempotency_key, calls[1].idempotency_key);
    assert_eq!(calls[1].count, 3);
    assert_eq!(h.remote.server_count(&user()), 3);
    assert_eq!(h.remote.applications(), 1);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(0));
}

#[tokio::test]
async fn resend_keeps_sealed_count_when_more_taps_arrived() {
    let h = harness(true, MockRemoteCounter::with_script([Scripted::NetworkError]));
    tap(&h.store, 2).await;
    h.coordinator.sync_offline_data().await;

    tap(&h.store, 1).await;
    let outcome = h.coordinator.sync_offline_data().await;
    assert!(matches!(outcome, SyncOutcome::Synced { applied: 2, .. }), "{outcome:?}");
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(1));

    // The leftover tap goes out under a fresh key.
    h.coordinator.sync_offline_data().await;
    let calls = h.remote.calls();
    assert_eq!(calls.len(), 3);
    assert_ne!(calls[1].idempotency_key, calls[2].idempotency_key);
    assert_eq!(h.remote.server_count(&user()), 3);
}

#[tokio::test]
async fn cleared_buffer_is_not_resent_under_its_old_batch() {
    let h = harness(true, MockRemoteCounter::with_script([Scripted::NetworkError]));
    tap(&h.store, 3).await;
    h.coordinator.sync_offline_data().await;

    h.store.clear_increments().await.unwrap();
    tap(&h.store, 1).await;

    let outcome = h.coordinator.sync_offline_data().await;
    assert!(matches!(outcome, SyncOutcome::Synced { applied: 1, .. }), "{outcome:?}");
    let calls = h.remote.calls();
    assert_eq!(calls.iter().map(|c| c.count).collect::<Vec<_>>(), vec![3, 1]);
    assert_ne!(calls[0].idempotency_key, calls[1].idempotency_key);
    assert_eq!(h.remote.server_count(&user()), 1);
}

#[tokio::test]
async fn tap_after_clearing_an_unacknowledged_batch_is_still_counted() {
    let h = harness(true, MockRemoteCounter::with_script([Scripted::LoseAck]));
    tap(&h.store, 3).await;
    h.coordinator.sync_offline_data().await;
    assert_eq!(h.remote.server_count(&user()), 3);

    h.store.clear_increments().await.unwrap();
    tap(&h.store, 1).await;

    assert!(h.coordinator.sync_offline_data().await.is_synced());
    assert_eq!(h.remote.server_count(&user()), 4);
    assert_eq!(h.remote.applications(), 2);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(0));
}

#[tokio::test]
async fn sealed_batch_larger_than_buffer_is_replaced() {
    let h = harness(true, MockRemoteCounter::new());
    tap(&h.store, 1).await;
    let stale = InFlightSync::seal(5);
    h.store.begin_sync(&stale).await.unwrap();

    let outcome = h.coordinator.sync_offline_data().await;
    assert!(matches!(outcome, SyncOutcome::Synced { applied: 1, .. }), "{outcome:?}");
    let calls = h.remote.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].count, 1);
    assert_ne!(calls[0].idempotency_key, stale.idempotency_key);
    assert_eq!(h.remote.server_count(&user()), 1);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(0));
    assert_eq!(h.store.in_flight().await, Stored::Value(None));
}

#[tokio::test]
async fn concurrent_sync_is_a_noop_while_one_is_in_flight() {
    let h = harness(true, MockRemoteCounter::new());
    let gate = h.remote.hold_calls();
    tap(&h.store, 2).await;

    let first = {
        let coordinator = Arc::clone(&h.coordinator);
        tokio::spawn(async move { coordinator.sync_offline_data().await })
    };
    gate.entered().await;
    assert_eq!(h.coordinator.state(), SyncState::Syncing);

    let second = h.coordinator.sync_offline_data().await;
    assert_eq!(second, SyncOutcome::Skipped(SkipReason::InFlight));

    gate.release();
    assert!(first.await.unwrap().is_synced());
    assert_eq!(h.remote.call_count(), 1);
    assert_eq!(h.coordinator.state(), SyncState::Idle);
}

#[tokio::test]
async fn taps_recorded_during_sync_survive_it() {
    let h = harness(true, MockRemoteCounter::new());
    let gate = h.remote.hold_calls();
    tap(&h.store, 3).await;

    let sync = {
        let coordinator = Arc::clone(&h.coordinator);
        tokio::spawn(async move { coordinator.sync_offline_data().await })
    };
    gate.entered().await;
    tap(&h.store, 1).await;
    gate.release();

    let outcome = sync.await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Synced { applied: 3, .. }), "{outcome:?}");
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(1));
    assert_eq!(h.coordinator.perceived_count().await, 4);
}

#[tokio::test]
async fn no_user_means_no_call() {
    let h = harness(true, MockRemoteCounter::new());
    h.session.sign_out();
    tap(&h.store, 1).await;

    assert_eq!(
        h.coordinator.sync_offline_data().await,
        SyncOutcome::Skipped(SkipReason::NoUser)
    );
    assert_eq!(h.remote.call_count(), 0);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(1));
}

#[tokio::test]
async fn empty_buffer_means_no_call() {
    let h = harness(true, MockRemoteCounter::new());
    assert_eq!(
        h.coordinator.sync_offline_data().await,
        SyncOutcome::Skipped(SkipReason::NothingPending)
    );
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn stale_sealed_batch_is_dropped_when_buffer_is_empty() {
    let h = harness(true, MockRemoteCounter::new());
    h.store.begin_sync(&InFlightSync::seal(4)).await.unwrap();

    h.coordinator.sync_offline_data().await;
    assert_eq!(h.store.in_flight().await, Stored::Value(None));
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_and_keeps_buffer() {
    let h = harness(true, MockRemoteCounter::new());
    h.remote.set_latency(Duration::from_secs(600));
    tap(&h.store, 1).await;

    let outcome = h.coordinator.sync_offline_data().await;
    match outcome {
        SyncOutcome::Failed { reason, retained } => {
            assert_eq!(retained, 1);
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(1));
    assert_eq!(h.coordinator.state(), SyncState::Idle);
}

// ─── Connectivity and start-up ─────────────────────────────

#[tokio::test(start_paused = true)]
async fn reconnect_waits_for_stabilization() {
    let h = harness(false, MockRemoteCounter::new());
    tap(&h.store, 2).await;

    h.coordinator.connectivity().set_connected(true);
    let started = tokio::time::Instant::now();
    let outcome = h.coordinator.on_connectivity_change(true).await;

    assert!(outcome.is_synced(), "{outcome:?}");
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(h.coordinator.is_offline().await, Stored::Value(false));
}

#[tokio::test(start_paused = true)]
async fn reconnect_is_abandoned_if_link_drops_during_stabilization() {
    let h = harness(false, MockRemoteCounter::new());
    tap(&h.store, 1).await;
    h.coordinator.connectivity().set_connected(true);

    let pending = {
        let coordinator = Arc::clone(&h.coordinator);
        tokio::spawn(async move { coordinator.on_connectivity_change(true).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.coordinator.state(), SyncState::AwaitingStabilization);
    h.coordinator.connectivity().set_connected(false);

    assert_eq!(
        pending.await.unwrap(),
        SyncOutcome::Skipped(SkipReason::Offline)
    );
    assert_eq!(h.remote.call_count(), 0);
    assert_eq!(h.coordinator.state(), SyncState::Idle);
}

#[tokio::test]
async fn reconnect_within_cooldown_is_not_admitted() {
    let h = harness(true, MockRemoteCounter::new());
    tap(&h.store, 1).await;
    h.store
        .set_last_sync_time(Utc::now() - chrono::Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(
        h.coordinator.on_connectivity_change(true).await,
        SyncOutcome::Skipped(SkipReason::NotAdmitted)
    );
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn going_offline_persists_the_flag() {
    let h = harness(true, MockRemoteCounter::new());
    assert_eq!(
        h.coordinator.on_connectivity_change(false).await,
        SyncOutcome::Skipped(SkipReason::Offline)
    );
    assert_eq!(h.coordinator.is_offline().await, Stored::Value(true));
}

#[tokio::test(start_paused = true)]
async fn start_syncs_immediately_when_connected() {
    let h = harness(true, MockRemoteCounter::new());
    tap(&h.store, 4).await;

    let started = tokio::time::Instant::now();
    assert!(h.coordinator.on_start().await.is_synced());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn start_while_offline_does_nothing() {
    let h = harness(false, MockRemoteCounter::new());
    tap(&h.store, 4).await;

    assert_eq!(
        h.coordinator.on_start().await,
        SyncOutcome::Skipped(SkipReason::Offline)
    );
    assert_eq!(h.coordinator.is_offline().await, Stored::Value(true));
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_loop_syncs_after_reconnect_and_stops_on_shutdown() {
    let h = harness(false, MockRemoteCounter::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&h.coordinator).run(shutdown_rx));

    tap(&h.store, 1).await;
    tap(&h.store, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.coordinator.connectivity().set_connected(true);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.remote.call_count(), 1);
    assert_eq!(h.coordinator.pending_count().await, Stored::Value(0));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

// ─── Degraded storage ──────────────────────────────────────

/// Delegates to a real store but can refuse to settle a confirmed batch.
struct SettleFailingStore {
    inner: OfflineStore,
    fail_settle: AtomicBool,
}

#[async_trait]
impl IOfflineStore for SettleFailingStore {
    async fn store_increment(&self, increment: PendingIncrement) -> WillResult<()> {
        self.inner.store_increment(increment).await
    }
    async fn get_increments(&self) -> Stored<Vec<PendingIncrement>> {
        self.inner.get_increments().await
    }
    async fn clear_increments(&self) -> WillResult<()> {
        self.inner.clear_increments().await
    }
    async fn settle_increments(&self, count: u64) -> WillResult<u64> {
        self.inner.settle_increments(count).await
    }
    async fn set_offline_mode(&self, offline: bool) -> WillResult<()> {
        self.inner.set_offline_mode(offline).await
    }
    async fn is_offline_mode(&self) -> Stored<bool> {
        self.inner.is_offline_mode().await
    }
    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> WillResult<()> {
        self.inner.set_last_sync_time(at).await
    }
    async fn get_last_sync_time(&self) -> Stored<Option<DateTime<Utc>>> {
        self.inner.get_last_sync_time().await
    }
    async fn in_flight(&self) -> Stored<Option<InFlightSync>> {
        self.inner.in_flight().await
    }
    async fn begin_sync(&self, batch: &InFlightSync) -> WillResult<()> {
        self.inner.begin_sync(batch).await
    }
    async fn complete_sync(&self, batch: &InFlightSync) -> WillResult<u64> {
        if self.fail_settle.load(Ordering::SeqCst) {
            return Err(StorageError::SqliteError {
                message: "database is locked".into(),
            }
            .into());
        }
        self.inner.complete_sync(batch).await
    }
    async fn abandon_sync(&self) -> WillResult<()> {
        self.inner.abandon_sync().await
    }
    async fn record_attempt(&self, attempt: &SyncAttempt) -> WillResult<()> {
        self.inner.record_attempt(attempt).await
    }
}

#[tokio::test]
async fn failed_local_settle_does_not_double_count() {
    let store = Arc::new(SettleFailingStore {
        inner: OfflineStore::open_in_memory().unwrap(),
        fail_settle: AtomicBool::new(true),
    });
    let remote = Arc::new(MockRemoteCounter::new());
    let coordinator = SyncCoordinator::new(
        store.clone(),
        remote.clone(),
        Arc::new(StaticSession::signed_in(user())),
        ConnectivityMonitor::new(true),
        SyncConfig::default(),
    );
    tap(&store.inner, 2).await;

    assert!(coordinator.sync_offline_data().await.is_synced());
    // Server has the batch, the buffer still holds it: show it once.
    assert_eq!(remote.server_count(&user()), 2);
    assert_eq!(coordinator.pending_count().await, Stored::Value(2));
    assert_eq!(coordinator.last_record(), None);
    assert_eq!(coordinator.perceived_count().await, 2);
    assert!(store.in_flight().await.or_default().is_some());

    store.fail_settle.store(false, Ordering::SeqCst);
    assert!(coordinator.sync_offline_data().await.is_synced());
    assert_eq!(remote.applications(), 1);
    assert_eq!(coordinator.pending_count().await, Stored::Value(0));
    assert_eq!(coordinator.perceived_count().await, 2);
}

/// A store whose reads all fail.
struct UnavailableStore;

#[async_trait]
impl IOfflineStore for UnavailableStore {
    async fn store_increment(&self, _increment: PendingIncrement) -> WillResult<()> {
        Ok(())
    }
    async fn get_increments(&self) -> Stored<Vec<PendingIncrement>> {
        Stored::unavailable("disk gone")
    }
    async fn clear_increments(&self) -> WillResult<()> {
        Ok(())
    }
    async fn settle_increments(&self, _count: u64) -> WillResult<u64> {
        Ok(0)
    }
    async fn set_offline_mode(&self, _offline: bool) -> WillResult<()> {
        Ok(())
    }
    async fn is_offline_mode(&self) -> Stored<bool> {
        Stored::unavailable("disk gone")
    }
    async fn set_last_sync_time(&self, _at: DateTime<Utc>) -> WillResult<()> {
        Ok(())
    }
    async fn get_last_sync_time(&self) -> Stored<Option<DateTime<Utc>>> {
        Stored::unavailable("disk gone")
    }
    async fn in_flight(&self) -> Stored<Option<InFlightSync>> {
        Stored::unavailable("disk gone")
    }
    async fn begin_sync(&self, _batch: &InFlightSync) -> WillResult<()> {
        Ok(())
    }
    async fn complete_sync(&self, _batch: &InFlightSync) -> WillResult<u64> {
        Ok(0)
    }
    async fn abandon_sync(&self) -> WillResult<()> {
        Ok(())
    }
    async fn record_attempt(&self, _attempt: &SyncAttempt) -> WillResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn unreadable_storage_skips_sync_and_degrades_reads() {
    let remote = Arc::new(MockRemoteCounter::new());
    let session: Arc<dyn ISessionProvider> = Arc::new(StaticSession::signed_in(user()));
    let coordinator = SyncCoordinator::new(
        Arc::new(UnavailableStore),
        remote.clone(),
        session,
        ConnectivityMonitor::new(true),
        SyncConfig::default(),
    );

    assert_eq!(
        coordinator.sync_offline_data().await,
        SyncOutcome::Skipped(SkipReason::StorageUnavailable)
    );
    assert!(!coordinator.should_sync().await);
    assert!(coordinator.pending_count().await.is_unavailable());
    assert_eq!(coordinator.perceived_count().await, 0);
    assert_eq!(remote.call_count(), 0);
}
