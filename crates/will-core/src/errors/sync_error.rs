/// Remote reconciliation errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("server rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("request {request_id} failed on the server: {reason}")]
    ApiError { request_id: String, reason: String },

    #[error("no authenticated user")]
    Unauthenticated,
}
