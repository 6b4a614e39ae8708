//! Versioned wire protocol: JSON envelopes around counter payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use will_core::errors::{SyncError, WillResult};
use will_core::models::UserId;

/// Current protocol version.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Envelope for all counter API requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest<T> {
    /// Protocol version for forward compatibility.
    pub version: String,
    /// Unique request ID for tracing. Retries of one call share it.
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

/// Envelope for all counter API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub version: String,
    /// Echoed request ID.
    pub request_id: String,
    pub success: bool,
    /// Error message if `success` is false.
    pub error: Option<String>,
    pub data: Option<T>,
}

/// Body of `POST /api/v1/counters/increments`: add `count` taps to the
/// user's record for `date`, once per `idempotency_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyIncrementsRequest {
    pub user_id: UserId,
    pub count: u64,
    pub date: NaiveDate,
    pub idempotency_key: Uuid,
}

impl<T> ApiRequest<T> {
    pub fn new(payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn ok(request_id: String, data: T) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            request_id,
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(request_id: String, error: String) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            request_id,
            success: false,
            error: Some(error),
            data: None,
        }
    }

    /// The payload of a successful response, which may legitimately be absent.
    pub fn into_data(self) -> WillResult<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(SyncError::ApiError {
                request_id: self.request_id,
                reason: self.error.unwrap_or_else(|| "unspecified error".to_string()),
            }
            .into())
        }
    }

    /// The payload of a successful response that must carry one.
    pub fn into_required(self) -> WillResult<T> {
        let request_id = self.request_id.clone();
        self.into_data()?.ok_or_else(|| {
            SyncError::ApiError {
                request_id,
                reason: "response carried no data".to_string(),
            }
            .into()
        })
    }
}
