use crate::models::UserId;

/// Source of the authenticated user. Sync is a no-op without one.
pub trait ISessionProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;

    /// Bearer token for the remote service, when the session carries one.
    fn bearer_token(&self) -> Option<String> {
        None
    }
}
