use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::User;

/// The signed-in state: bearer token plus the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub current_user: Option<User>,
}

/// Shared handle to the session. Owned by the application shell and passed
/// explicitly to every component that needs the token or the user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().current_user.clone()
    }

    /// Did of the current user, if signed in.
    pub fn did(&self) -> Option<String> {
        self.read().current_user.as_ref().map(|u| u.did.clone())
    }

    /// A session is active once both the token and the user are known.
    pub fn is_active(&self) -> bool {
        let state = self.read();
        state.access_token.is_some() && state.current_user.is_some()
    }

    pub fn sign_in(&self, access_token: String, user: User) {
        let mut state = self.write();
        state.access_token = Some(access_token);
        state.current_user = Some(user);
    }

    pub fn set_access_token(&self, access_token: String) {
        self.write().access_token = Some(access_token);
    }

    pub fn set_user(&self, user: User) {
        self.write().current_user = Some(user);
    }

    /// Apply `f` to the current user, returning the updated record.
    pub fn update_user(&self, f: impl FnOnce(&mut User)) -> Option<User> {
        let mut state = self.write();
        let user = state.current_user.as_mut()?;
        f(user);
        Some(user.clone())
    }

    pub fn clear(&self) {
        *self.write() = SessionState::default();
    }
}
