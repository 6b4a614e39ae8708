use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use will_core::errors::{SyncError, WillResult};
use will_core::models::{RemoteCounterRecord, UserId};
use will_core::traits::IRemoteCounter;

use crate::IdempotentServer;

/// Behavior forced onto the next remote call, consumed first-in first-out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scripted {
    /// Fail before reaching the server.
    NetworkError,
    /// The server refuses the request.
    Reject { status: u16 },
    /// The server applies the batch but the response never arrives.
    LoseAck,
}

/// One `apply_offline_increments` call as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub user: UserId,
    pub count: u64,
    pub idempotency_key: Uuid,
}

/// Holds remote calls open until the test releases them.
#[derive(Debug, Clone)]
pub struct CallGate {
    entered: Arc<Notify>,
    release: Arc<Semaphore>,
}

impl CallGate {
    fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    /// Resolves once a call is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked call proceed.
    pub fn release(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }
}

/// Scriptable `IRemoteCounter` backed by an [`IdempotentServer`].
#[derive(Debug, Default)]
pub struct MockRemoteCounter {
    server: Mutex<IdempotentServer>,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Mutex<Option<CallGate>>,
    latency: Mutex<Option<Duration>>,
    fetches: Mutex<usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockRemoteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: impl IntoIterator<Item = Scripted>) -> Self {
        let mock = Self::new();
        lock(&mock.script).extend(script);
        mock
    }

    /// Queue a behavior for an upcoming call.
    pub fn script(&self, behavior: Scripted) {
        lock(&self.script).push_back(behavior);
    }

    pub fn seed(&self, user: &UserId, count: u64) {
        lock(&self.server).seed(user, count);
    }

    /// Park every subsequent call at the returned gate.
    pub fn hold_calls(&self) -> CallGate {
        let gate = CallGate::new();
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn fetch_count(&self) -> usize {
        *lock(&self.fetches)
    }

    pub fn server_count(&self, user: &UserId) -> u64 {
        lock(&self.server).count_for(user)
    }

    pub fn applications(&self) -> usize {
        lock(&self.server).applications()
    }
}

#[async_trait]
impl IRemoteCounter for MockRemoteCounter {
    async fn apply_offline_increments(
        &self,
        user: &UserId,
        count: u64,
        idempotency_key: Uuid,
    ) -> WillResult<RemoteCounterRecord> {
        lock(&self.calls).push(RecordedCall {
            user: user.clone(),
            count,
            idempotency_key,
        });

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let behavior = lock(&self.script).pop_front();
        match behavior {
            Some(Scripted::NetworkError) => Err(SyncError::NetworkError {
                reason: "connection refused".into(),
            }
            .into()),
            Some(Scripted::Reject { status }) => Err(SyncError::Rejected {
                status,
                reason: "rejected by script".into(),
            }
            .into()),
            Some(Scripted::LoseAck) => {
                lock(&self.server).apply(user, count, idempotency_key);
                Err(SyncError::NetworkError {
                    reason: "connection reset before response".into(),
                }
                .into())
            }
            None => Ok(lock(&self.server).apply(user, count, idempotency_key)),
        }
    }

    async fn fetch_today(&self, user: &UserId) -> WillResult<Option<RemoteCounterRecord>> {
        *lock(&self.fetches) += 1;
        Ok(lock(&self.server).today(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_is_consumed_in_order() {
        let mock = MockRemoteCounter::with_script([Scripted::NetworkError, Scripted::LoseAck]);
        let user = UserId::from("u1");
        let key = Uuid::new_v4();

        assert!(mock.apply_offline_increments(&user, 2, key).await.is_err());
        assert_eq!(mock.server_count(&user), 0);

        assert!(mock.apply_offline_increments(&user, 2, key).await.is_err());
        assert_eq!(mock.server_count(&user), 2);

        let record = mock.apply_offline_increments(&user, 2, key).await.unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(mock.applications(), 1);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn gate_parks_call_until_released() {
        let mock = Arc::new(MockRemoteCounter::new());
        let gate = mock.hold_calls();
        let user = UserId::from("u1");

        let task = {
            let mock = Arc::clone(&mock);
            let user = user.clone();
            tokio::spawn(async move { mock.apply_offline_increments(&user, 1, Uuid::new_v4()).await })
        };
        gate.entered().await;
        assert_eq!(mock.server_count(&user), 0);

        gate.release();
        let record = task.await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[test]
    fn scripted_parses_tagged_json() {
        let script: Vec<Scripted> = serde_json::from_str(
            r#"[{"kind":"network_error"},{"kind":"reject","status":422},{"kind":"lose_ack"}]"#,
        )
        .unwrap();
        assert_eq!(
            script,
            vec![
                Scripted::NetworkError,
                Scripted::Reject { status: 422 },
                Scripted::LoseAck
            ]
        );
    }
}
