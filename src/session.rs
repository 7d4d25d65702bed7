use std::sync::{PoisonError, RwLock};

use crate::types::{AuthPayload, UserId};

/// Authentication state of the signed-in user.
///
/// Holding a non-empty `access_token` is what makes a session authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: UserId,
}

impl Session {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user_id: user_id.into(),
        }
    }

    /// Signed-out session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Access token, if present and non-empty.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        non_empty(self.access_token.as_deref())
    }

    /// Refresh token, if present and non-empty.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        non_empty(self.refresh_token.as_deref())
    }
}

impl From<AuthPayload> for Session {
    fn from(payload: AuthPayload) -> Self {
        Self::new(payload.access_token, payload.refresh_token, payload.user.id)
    }
}

fn non_empty(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}

/// Process-wide credential storage.
///
/// Implementations must make `set` a single atomic replacement: a concurrent
/// `get` observes either the old session or the new one, never a mix.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for KeychainStore {
///     fn get(&self) -> Session {
///         self.cached.read().unwrap().clone()
///     }
///
///     fn set(&self, session: Session) {
///         self.keychain.save(&session);
///         *self.cached.write().unwrap() = session;
///     }
///
///     fn clear(&self) {
///         self.keychain.delete();
///         *self.cached.write().unwrap() = Session::anonymous();
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Snapshot of the current session.
    fn get(&self) -> Session;

    /// Replace the current session.
    fn set(&self, session: Session);

    /// Drop all credentials (logout).
    fn clear(&self);
}

/// In-memory [`SessionStore`] guarding a single `Session` value.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    current: RwLock<Session>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            current: RwLock::new(session),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn clear(&self) {
        self.set(Session::anonymous());
    }
}
