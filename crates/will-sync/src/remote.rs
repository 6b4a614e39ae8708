//! `IRemoteCounter` over the HTTP counter API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use uuid::Uuid;

use will_core::config::SyncConfig;
use will_core::errors::WillResult;
use will_core::models::{RemoteCounterRecord, UserId};
use will_core::traits::{IRemoteCounter, ISessionProvider};

use crate::transport::{ApplyIncrementsRequest, HttpClient, HttpClientConfig};

const INCREMENTS_PATH: &str = "/api/v1/counters/increments";
const TODAY_PATH: &str = "/api/v1/counters/today";

/// Remote counter reached over HTTP. The bearer token is read from the
/// session on every call so sign-in changes take effect immediately.
pub struct HttpCounterService {
    client: HttpClient,
    session: Arc<dyn ISessionProvider>,
}

impl HttpCounterService {
    pub fn new(client: HttpClient, session: Arc<dyn ISessionProvider>) -> Self {
        Self { client, session }
    }

    pub fn from_config(config: &SyncConfig, session: Arc<dyn ISessionProvider>) -> WillResult<Self> {
        let client = HttpClient::new(HttpClientConfig::from_sync_config(config)?)?;
        Ok(Self::new(client, session))
    }
}

#[async_trait]
impl IRemoteCounter for HttpCounterService {
    async fn apply_offline_increments(
        &self,
        user: &UserId,
        count: u64,
        idempotency_key: Uuid,
    ) -> WillResult<RemoteCounterRecord> {
        let payload = ApplyIncrementsRequest {
            user_id: user.clone(),
            count,
            date: Local::now().date_naive(),
            idempotency_key,
        };
        let token = self.session.bearer_token();
        self.client
            .post(INCREMENTS_PATH, payload, token.as_deref(), Some(idempotency_key))
            .await?
            .into_required()
    }

    async fn fetch_today(&self, user: &UserId) -> WillResult<Option<RemoteCounterRecord>> {
        let token = self.session.bearer_token();
        self.client
            .get(TODAY_PATH, &[("user_id", user.as_str())], token.as_deref())
            .await?
            .into_data()
    }
}
