//! Observer registry for session state changes.

use crate::types::WalletState;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback receiving every state snapshot.
#[cfg(target_arch = "wasm32")]
pub type Listener = Arc<dyn Fn(&WalletState)>;

#[cfg(not(target_arch = "wasm32"))]
pub type Listener = Arc<dyn Fn(&WalletState) + Send + Sync>;

pub type ListenerId = u64;

#[derive(Default)]
struct Entries {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, Listener)>,
}

/// Ordered set of listeners.
///
/// Registering the same `Arc` twice is a no-op that hands back a handle to the
/// existing registration.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    entries: Arc<Mutex<Entries>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener) -> ListenerHandle {
        let mut entries = lock(&self.entries);

        let existing = entries
            .listeners
            .iter()
            .find(|(_, l)| Arc::ptr_eq(l, &listener))
            .map(|(id, _)| *id);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = entries.next_id;
                entries.next_id += 1;
                entries.listeners.push((id, listener));
                id
            }
        };

        ListenerHandle {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        remove(&self.entries, id)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener in registration order with `state`.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns how many listeners panicked.
    pub fn notify(&self, state: &WalletState) -> usize {
        // Snapshot so listeners may add or detach listeners while being called.
        let listeners: Vec<(ListenerId, Listener)> = lock(&self.entries).listeners.clone();

        let mut failures = 0;
        for (id, listener) in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(state))) {
                failures += 1;
                log::error!(
                    "Wallet listener {} panicked: {}",
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
        failures
    }
}

/// Detach handle returned by [`ListenerRegistry::add`].
///
/// Dropping the handle keeps the listener registered.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    entries: Weak<Mutex<Entries>>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop receiving notifications.
    pub fn detach(self) -> bool {
        match self.entries.upgrade() {
            Some(entries) => remove(&entries, self.id),
            None => false,
        }
    }
}

fn remove(entries: &Mutex<Entries>, id: ListenerId) -> bool {
    let mut entries = lock(entries);
    let before = entries.listeners.len();
    entries.listeners.retain(|(existing, _)| *existing != id);
    entries.listeners.len() != before
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Lock ignoring poisoning; state guarded here stays consistent between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
