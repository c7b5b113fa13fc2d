//! Per-tab session store.
//!
//! ARCHITECTURE
//! ============
//! `SessionStore` is the only writer of the tab's [`AuthState`]. It is a
//! cheap clonable handle; components receive a clone (or a watch receiver
//! from [`SessionStore::subscribe`]) instead of reaching for a global.
//!
//! - `refresh` asks the server who is signed in.
//! - `logout` invalidates the credential and clears the user regardless of
//!   whether the server call worked.
//! - `login`/`register` submit credentials, then refresh.
//! - `update_profile` changes the credential's display name, then refreshes.
//! - `mount` runs the first refresh and re-runs it whenever another tab
//!   signals an auth change.
//!
//! ORDERING
//! ========
//! Refreshes are not serialized. Each one takes a sequence number when it
//! starts; a completion is applied only if it is newer than the last applied
//! one, and `loading` drops to `false` only when the most recently started
//! refresh completes. Logout counts as the newest write, so a refresh that
//! was in flight when it ran cannot resurrect the old user.
//!
//! ERROR HANDLING
//! ==============
//! Session-check and logout failures are logged and folded into "signed
//! out". This cannot tell "not signed in" from "server unreachable"; there
//! is no retry path.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};

use super::auth::AuthState;
use crate::net::api::{ApiError, SessionBackend};
use crate::net::types::{Credentials, ProfileUpdate, User};
use crate::notify::{Notifier, Subscription};

const CHANGE_CAPACITY: usize = 16;

/// Caller-supplied side effect run at the end of [`SessionStore::logout`],
/// typically a navigation to the home page.
pub type Navigate = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct RefreshSeq {
    /// Sequence number of the most recently started refresh.
    started: u64,
    /// Sequence number of the newest write applied to state.
    applied: u64,
}

struct Inner {
    backend: Arc<dyn SessionBackend>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<AuthState>,
    changes: broadcast::Sender<Option<User>>,
    seq: Mutex<RefreshSeq>,
}

/// Owner of one tab's [`AuthState`]; clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// New store in the unresolved state (`loading == true`, no user).
    #[must_use]
    pub fn new(backend: Arc<dyn SessionBackend>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(AuthState::unresolved());
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { inner: Arc::new(Inner { backend, notifier, state, changes, seq: Mutex::new(RefreshSeq::default()) }) }
    }

    /// Current `{user, loading}`.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Receiver for render-facing state; always holds the latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Every applied user change, in order, as soon as it is applied.
    #[must_use]
    pub fn session_changes(&self) -> broadcast::Receiver<Option<User>> {
        self.inner.changes.subscribe()
    }

    /// Re-resolve the session from the server. Never fails: errors read as
    /// "signed out". Returns the user held once this call has settled.
    pub async fn refresh(&self) -> Option<User> {
        let seq = {
            let mut seq = self.lock_seq();
            seq.started += 1;
            self.inner.state.send_modify(|s| s.loading = true);
            seq.started
        };

        let resolved = match self.inner.backend.fetch_current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "session check failed; treating as signed out");
                None
            }
        };

        self.complete_refresh(seq, resolved);
        self.user()
    }

    fn complete_refresh(&self, seq: u64, resolved: Option<User>) {
        let mut counters = self.lock_seq();
        let latest = seq == counters.started;
        if seq <= counters.applied {
            tracing::debug!(seq, applied = counters.applied, "discarding stale session check");
            return;
        }
        counters.applied = seq;
        self.inner.state.send_modify(|s| {
            s.user = resolved.clone();
            if latest {
                s.loading = false;
            }
        });
        let _ = self.inner.changes.send(resolved);
    }

    /// Sign out: invalidate the credential, clear the user, signal other
    /// tabs, then run `navigate`. The local session is cleared even if the
    /// server call fails.
    pub async fn logout(&self, navigate: Option<Navigate>) {
        if let Err(e) = self.inner.backend.logout().await {
            tracing::warn!(error = %e, "logout request failed; clearing local session anyway");
        }

        {
            let mut seq = self.lock_seq();
            seq.started += 1;
            seq.applied = seq.started;
            self.inner.state.send_modify(|s| {
                s.user = None;
                s.loading = false;
            });
            let _ = self.inner.changes.send(None);
        }

        self.inner.notifier.notify();
        if let Some(navigate) = navigate {
            navigate();
        }
    }

    /// Submit credentials. On success the server has set the credential;
    /// the store refreshes and other tabs are signalled.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or a transport error. The store is
    /// refreshed either way.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let result = self.inner.backend.login(credentials).await;
        self.refresh().await;
        if result.is_ok() {
            self.inner.notifier.notify();
        }
        result
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or a transport error. The store is
    /// refreshed either way.
    pub async fn register(&self, credentials: &Credentials) -> Result<Option<User>, ApiError> {
        let result = self.inner.backend.register(credentials).await;
        let user = self.refresh().await;
        result?;
        self.inner.notifier.notify();
        Ok(user)
    }

    /// Change profile fields of the signed-in user. On success the store
    /// refreshes (picking up a new display name) and other tabs are
    /// signalled.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or a transport error. The store is
    /// refreshed either way.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, ApiError> {
        let result = self.inner.backend.update_profile(update).await;
        let user = self.refresh().await;
        result?;
        self.inner.notifier.notify();
        Ok(user)
    }

    /// Start the tab's session lifecycle: an initial refresh plus a refresh
    /// on every auth signal from another tab. Dropping the returned guard
    /// stops listening. Must be called inside a tokio runtime.
    pub fn mount(&self) -> MountedSession {
        let listener = {
            let store = self.clone();
            self.inner.notifier.on_external_change(Box::new(move || {
                let store = store.clone();
                tokio::spawn(async move {
                    store.refresh().await;
                });
            }))
        };

        let store = self.clone();
        tokio::spawn(async move {
            store.refresh().await;
        });

        MountedSession { _listener: listener }
    }

    fn lock_seq(&self) -> MutexGuard<'_, RefreshSeq> {
        self.inner.seq.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Guard returned by [`SessionStore::mount`].
#[derive(Debug)]
pub struct MountedSession {
    _listener: Subscription,
}
