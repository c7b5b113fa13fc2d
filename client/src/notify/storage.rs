//! Same-origin shared storage and the notifier built on it.
//!
//! DESIGN
//! ======
//! [`SharedStorage`] models origin-wide key/value storage: one map, one
//! change stream. Each tab opens a [`TabStorage`] handle. A write is
//! reported to every tab except the writer, and only when it changes
//! something (setting an equal value or removing a missing key is silent).
//!
//! [`StorageNotifier`] signals by writing a timestamp under
//! [`AUTH_SIGNAL_KEY`] and removing it straight away, so the next signal is
//! always a real change even if the timestamp repeats. Listeners act on the
//! write half only, which makes one `notify()` one callback per other tab.
//!
//! TRADE-OFFS
//! ==========
//! The change stream is bounded. A listener that falls behind loses the
//! skipped events and is told how many; the notifier turns that into a
//! single callback, so delivery is at-least-once rather than exact.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{ChangeCallback, Notifier, Subscription};

/// Well-known key used as the auth-change signalling channel.
pub const AUTH_SIGNAL_KEY: &str = "auth_state_change";

const EVENT_CAPACITY: usize = 64;

/// One observed storage mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    source: u64,
}

/// What a tab's event stream yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Event(StorageEvent),
    /// The listener fell behind and this many events were dropped.
    Missed(u64),
}

struct StorageInner {
    items: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_tab: AtomicU64,
}

/// Origin-wide storage shared by all tabs of one browser profile.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<StorageInner>,
}

impl SharedStorage {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StorageInner { items: Mutex::new(HashMap::new()), events, next_tab: AtomicU64::new(1) }),
        }
    }

    /// Handle for a newly opened tab.
    #[must_use]
    pub fn open_tab(&self) -> TabStorage {
        let id = self.inner.next_tab.fetch_add(1, Ordering::Relaxed);
        TabStorage { id, shared: self.clone() }
    }

    fn write(&self, source: u64, key: &str, value: Option<&str>) {
        let mut items = self.inner.items.lock().unwrap_or_else(PoisonError::into_inner);
        let old_value = match value {
            Some(v) => items.insert(key.to_owned(), v.to_owned()),
            None => items.remove(key),
        };
        if old_value.as_deref() == value {
            return;
        }
        // Sent under the lock so every tab sees writes in commit order.
        // No receivers is fine: nobody else is listening.
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_owned(),
            old_value,
            new_value: value.map(str::to_owned),
            source,
        });
    }
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// One tab's view of [`SharedStorage`].
#[derive(Clone)]
pub struct TabStorage {
    id: u64,
    shared: SharedStorage,
}

impl TabStorage {
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        let items = self.shared.inner.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) {
        self.shared.write(self.id, key, Some(value));
    }

    pub fn remove_item(&self, key: &str) {
        self.shared.write(self.id, key, None);
    }

    /// Changes made by other tabs from now on.
    #[must_use]
    pub fn events(&self) -> StorageEvents {
        StorageEvents { tab: self.id, rx: self.shared.inner.events.subscribe() }
    }
}

/// Stream of other tabs' storage changes.
pub struct StorageEvents {
    tab: u64,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Next change from another tab; `None` once the storage is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.source == self.tab => {}
                Ok(event) => return Some(Delivery::Event(event)),
                Err(RecvError::Lagged(missed)) => return Some(Delivery::Missed(missed)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// [`Notifier`] over a tab's shared-storage handle.
#[derive(Clone)]
pub struct StorageNotifier {
    storage: TabStorage,
}

impl StorageNotifier {
    #[must_use]
    pub fn new(storage: TabStorage) -> Self {
        Self { storage }
    }
}

impl Notifier for StorageNotifier {
    fn notify(&self) {
        let stamp = now_millis().to_string();
        self.storage.set_item(AUTH_SIGNAL_KEY, &stamp);
        self.storage.remove_item(AUTH_SIGNAL_KEY);
    }

    /// Spawns a listener task; must be called inside a tokio runtime.
    fn on_external_change(&self, callback: ChangeCallback) -> Subscription {
        // Subscribe before spawning so signals sent right after this call
        // returns are not lost.
        let mut events = self.storage.events();
        let task = tokio::spawn(async move {
            while let Some(delivery) = events.recv().await {
                match delivery {
                    Delivery::Event(event) if is_auth_signal(&event) => callback(),
                    Delivery::Event(_) => {}
                    Delivery::Missed(missed) => {
                        tracing::debug!(missed, "storage listener lagged; treating as one auth change");
                        callback();
                    }
                }
            }
        });
        Subscription::from_task(task)
    }
}

/// The write half of a signal. The paired removal is ignored.
fn is_auth_signal(event: &StorageEvent) -> bool {
    event.key == AUTH_SIGNAL_KEY && event.new_value.is_some()
}

fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis())
}
