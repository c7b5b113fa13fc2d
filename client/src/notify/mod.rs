//! Cross-tab "auth changed" signalling.
//!
//! ARCHITECTURE
//! ============
//! Every tab has its own session store, so a sign-in or sign-out in one tab
//! must wake the others. A [`Notifier`] carries that wake-up pulse; it holds
//! no auth state. Receivers re-check the session themselves, so duplicated
//! or reordered pulses are harmless.

pub mod storage;

pub use storage::{AUTH_SIGNAL_KEY, SharedStorage, StorageNotifier, TabStorage};

use tokio::task::JoinHandle;

/// Callback run when another tab signals an auth change.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync + 'static>;

pub trait Notifier: Send + Sync {
    /// Tell every other tab that auth state changed.
    fn notify(&self);

    /// Run `callback` whenever another tab calls [`Notifier::notify`].
    /// The callback stays registered until the returned guard is dropped.
    fn on_external_change(&self, callback: ChangeCallback) -> Subscription;
}

/// Registration guard; dropping it deregisters the listener.
#[must_use = "dropping a Subscription deregisters the listener immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Guard that aborts a listener task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    /// Deregister now. Same as dropping.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}
