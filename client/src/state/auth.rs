//! Auth-session snapshot for the current tab.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read by route guards and user-aware components to coordinate login
//! redirects and identity-dependent rendering. Only
//! [`SessionStore`](super::session::SessionStore) produces new values.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::User;

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl AuthState {
    /// State of a freshly opened tab: nobody known yet, first check pending.
    #[must_use]
    pub fn unresolved() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Page-level redirect rule: leave once auth has settled with no user.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}
