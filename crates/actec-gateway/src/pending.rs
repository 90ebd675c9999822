//! Requests waiting for the gateway to reply
//!
//! Device `get` replies echo the device, endpoint and action they answer, so
//! gets are queued per [`PropertyKey`] and resolved oldest first. Set,
//! trigger and group set replies carry nothing to correlate on; each kind
//! has a single slot and callers serialize on it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use actec_protocol::{OperationKind, PropertyKey, PropertyReport};
use serde_json::Value;
use tokio::sync::oneshot;

#[derive(Default)]
pub(crate) struct PendingRequests {
    gets: Mutex<HashMap<PropertyKey, VecDeque<oneshot::Sender<PropertyReport>>>>,
    completions: Mutex<HashMap<OperationKind, oneshot::Sender<Value>>>,
}

impl PendingRequests {
    pub(crate) fn register_get(&self, key: PropertyKey) -> oneshot::Receiver<PropertyReport> {
        let (tx, rx) = oneshot::channel();
        self.gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .push_back(tx);
        rx
    }

    /// Hand `report` to the oldest live waiter for its key
    ///
    /// Waiters that gave up are skipped. Returns false when nobody was
    /// waiting.
    pub(crate) fn resolve_get(&self, report: PropertyReport) -> bool {
        let key = report.key();
        let mut gets = self.gets.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(queue) = gets.get_mut(&key) else {
            return false;
        };

        let mut report = report;
        let mut delivered = false;
        while let Some(waiter) = queue.pop_front() {
            match waiter.send(report) {
                Ok(()) => {
                    delivered = true;
                    break;
                }
                Err(returned) => report = returned,
            }
        }
        if queue.is_empty() {
            gets.remove(&key);
        }
        delivered
    }

    pub(crate) fn register_completion(&self, kind: OperationKind) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, tx);
        rx
    }

    pub(crate) fn resolve_completion(&self, kind: OperationKind, body: Value) -> bool {
        let waiter = self
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
        match waiter {
            Some(waiter) => waiter.send(body).is_ok(),
            None => false,
        }
    }

    pub(crate) fn cancel_completion(&self, kind: OperationKind) {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    /// Drop every waiter; their receivers observe a closed channel
    pub(crate) fn fail_all(&self) -> usize {
        let gets: usize = self
            .gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, queue)| queue.len())
            .sum();
        let completions = self
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .count();
        gets + completions
    }

    pub(crate) fn len(&self) -> usize {
        let gets: usize = self
            .gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(VecDeque::len)
            .sum();
        gets + self
            .completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
