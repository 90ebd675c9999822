//! Availability shared by every unit

use std::sync::atomic::{AtomicBool, Ordering};

use crate::listeners::{ListenerSet, Unsubscribe};

/// Availability flag of a device, scene or group
#[derive(Default)]
pub struct Availability {
    available: AtomicBool,
    listeners: ListenerSet<bool>,
}

impl Availability {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            listeners: ListenerSet::new(),
        }
    }

    pub fn get(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Update the flag, notifying listeners only when it flips
    pub fn set(&self, available: bool) {
        if self.available.swap(available, Ordering::SeqCst) != available {
            self.listeners.notify(&available);
        }
    }

    pub fn add_listener<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.add(move |available: &bool| callback(*available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_notifies_on_flip_only() {
        let availability = Availability::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _handle = availability.add_listener({
            let seen = Arc::clone(&seen);
            move |available| seen.lock().unwrap().push(available)
        });

        availability.set(true);
        availability.set(true);
        availability.set(false);
        availability.set(false);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!availability.get());
    }
}
