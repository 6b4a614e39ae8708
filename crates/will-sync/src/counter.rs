//! The tap entry point.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use will_core::errors::{SyncError, WillResult};
use will_core::models::{PendingIncrement, RemoteCounterRecord};

use crate::coordinator::SyncCoordinator;

/// Where a tap ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// Applied on the server right away.
    Sent { record: RemoteCounterRecord },
    /// Buffered locally; `pending` is the buffered total including this tap.
    Buffered { pending: u64 },
}

/// Records taps: straight to the server when online and signed in, into the
/// offline buffer otherwise.
pub struct WillCounter {
    coordinator: Arc<SyncCoordinator>,
}

impl WillCounter {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Record one tap.
    ///
    /// Only a failure to buffer is an error; a failed direct send falls back
    /// to the buffer, and a network-level failure also flips offline mode on.
    pub async fn increment(&self) -> WillResult<TapOutcome> {
        let c = &self.coordinator;
        let offline = !c.connectivity.is_connected() || c.store.is_offline_mode().await.or_default();
        let user = c.session.current_user();

        if let (Some(user), false) = (user, offline) {
            let call = c.remote.apply_offline_increments(&user, 1, Uuid::new_v4());
            let sent = match tokio::time::timeout(c.config.request_timeout(), call).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout {
                    after_ms: c.config.request_timeout().as_millis() as u64,
                }
                .into()),
            };
            match sent {
                Ok(record) => {
                    tracing::debug!(count = record.count, "counter: tap sent");
                    c.remember_record(record.clone());
                    return Ok(TapOutcome::Sent { record });
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("counter: send failed, going offline: {e}");
                    if let Err(e) = c.store.set_offline_mode(true).await {
                        tracing::warn!("counter: failed to persist offline flag: {e}");
                    }
                }
                Err(e) => tracing::warn!("counter: send rejected, buffering: {e}"),
            }
        }

        self.buffer().await
    }

    async fn buffer(&self) -> WillResult<TapOutcome> {
        let store = &self.coordinator.store;
        async {
            store.store_increment(PendingIncrement::tap()).await?;
            let pending = store.get_increment_count().await.or_default();
            tracing::debug!(pending, "counter: tap buffered");
            Ok(TapOutcome::Buffered { pending })
        }
        .instrument(will_observability::store_span!("store_increment"))
        .await
    }

    /// Pull today's record from the server and remember it.
    pub async fn refresh(&self) -> WillResult<Option<RemoteCounterRecord>> {
        let c = &self.coordinator;
        let Some(user) = c.session.current_user() else {
            return Err(SyncError::Unauthenticated.into());
        };
        let fetch = c.remote.fetch_today(&user);
        let record = match tokio::time::timeout(c.config.request_timeout(), fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SyncError::Timeout {
                    after_ms: c.config.request_timeout().as_millis() as u64,
                }
                .into())
            }
        };
        if let Some(ref record) = record {
            c.remember_record(record.clone());
        }
        Ok(record)
    }

    /// Last known remote count plus everything still buffered.
    pub async fn perceived_count(&self) -> u64 {
        self.coordinator.perceived_count().await
    }
}
