//! HTTP client with retry, exponential backoff, and per-request timeout.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use will_core::config::SyncConfig;
use will_core::errors::{SyncError, WillError, WillResult};

use super::protocol::{ApiRequest, ApiResponse};

/// Header carrying the batch key the server deduplicates on.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Configuration for the HTTP transport layer.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the counter API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of retry attempts after the first.
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry).
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl HttpClientConfig {
    /// Derive transport settings from the sync section. Fails without an
    /// endpoint.
    pub fn from_sync_config(config: &SyncConfig) -> WillResult<Self> {
        let base_url = config
            .endpoint_url
            .clone()
            .ok_or_else(|| WillError::ConfigError {
                reason: "sync.endpoint_url is not set".to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: config.attempt_timeout(),
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        })
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

fn net_err(reason: String) -> WillError {
    SyncError::NetworkError { reason }.into()
}

/// Async HTTP transport over `reqwest` with bounded retries.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpClientConfig,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> WillResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| net_err(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// POST `payload` wrapped in an [`ApiRequest`] envelope.
    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        payload: Req,
        bearer: Option<&str>,
        idempotency_key: Option<Uuid>,
    ) -> WillResult<ApiResponse<Resp>> {
        let request = ApiRequest::new(payload);
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!(request_id = %request.request_id, %url, "transport: POST");
        self.do_request(reqwest::Method::POST, &url, &[], Some(&request), bearer, idempotency_key)
            .await
    }

    /// GET a resource.
    pub async fn get<Resp: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> WillResult<ApiResponse<Resp>> {
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!(%url, "transport: GET");
        self.do_request(reqwest::Method::GET, &url, query, None::<&()>, bearer, None)
            .await
    }

    /// Unified retry loop. Client errors (4xx) are returned at once; server
    /// errors and connection failures are retried with backoff.
    async fn do_request<Resp: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&impl Serialize>,
        bearer: Option<&str>,
        idempotency_key: Option<Uuid>,
    ) -> WillResult<ApiResponse<Resp>> {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "transport: retry attempt {}/{} after {:?}",
                    attempt,
                    self.config.max_retries,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
            }

            let mut req = self.client.request(method.clone(), url);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(b) = body {
                req = req.json(b);
            }
            if let Some(token) = bearer {
                req = req.bearer_auth(token);
            }
            if let Some(key) = idempotency_key {
                req = req.header(IDEMPOTENCY_HEADER, key.to_string());
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<ApiResponse<Resp>>().await.map_err(|e| {
                            net_err(format!("deserialization failed: {e}"))
                        });
                    }
                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(SyncError::Unauthenticated.into());
                    }
                    if status.is_client_error() {
                        let body_text = resp.text().await.unwrap_or_default();
                        return Err(SyncError::Rejected {
                            status: status.as_u16(),
                            reason: body_text,
                        }
                        .into());
                    }
                    last_err = format!("HTTP {status}");
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }
        }

        Err(net_err(format!(
            "all {} retries exhausted: {last_err}",
            self.config.max_retries
        )))
    }
}
