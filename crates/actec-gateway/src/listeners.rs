//! Callback sets with removal handles

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// A unique identifier for a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Callback<T>)>>,
}

impl<T> Registry<T> {
    fn remove(&self, id: ListenerId) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry, _)| *entry != id);
    }
}

/// A set of callbacks notified with a `&T`
///
/// Notification iterates over a snapshot, so a callback may add or remove
/// listeners (including itself) while it runs.
pub struct ListenerSet<T> {
    inner: Arc<Registry<T>>,
}

impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback; it stays registered until the handle is used
    pub fn add<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        let registry: Weak<Registry<T>> = Arc::downgrade(&self.inner);
        Unsubscribe {
            id,
            remove: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(id);
                }
            })),
        }
    }

    /// Call every registered callback with `value`
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned when a listener is registered
///
/// Dropping the handle leaves the listener in place; call
/// [`Unsubscribe::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to remove the listener"]
pub struct Unsubscribe {
    id: ListenerId,
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}
