use std::sync::{PoisonError, RwLock};

use will_core::models::UserId;
use will_core::traits::ISessionProvider;

/// In-process session: whoever signed in last, plus an optional bearer token.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<UserId>>,
    token: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: impl Into<UserId>) -> Self {
        let session = Self::new();
        session.sign_in(user, None);
        session
    }

    pub fn sign_in(&self, user: impl Into<UserId>, token: Option<String>) {
        let user = user.into();
        tracing::info!(%user, "session: signed in");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::info!("session: signed out");
    }
}

impl ISessionProvider for StaticSession {
    fn current_user(&self) -> Option<UserId> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_out_forgets_user_and_token() {
        let session = StaticSession::new();
        assert_eq!(session.current_user(), None);

        session.sign_in("u1", Some("tok".into()));
        assert_eq!(session.current_user(), Some(UserId::from("u1")));
        assert_eq!(session.bearer_token().as_deref(), Some("tok"));

        session.sign_out();
        assert_eq!(session.current_user(), None);
        assert_eq!(session.bearer_token(), None);
    }
}
