//! Outbound commands with reply correlation

use std::sync::Arc;
use std::time::Duration;

use actec_client::Session;
use actec_protocol::{
    commands, Message, OperationKind, PropertyKey, PropertyReport, PropertyValue,
};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::pending::PendingRequests;

/// Sends commands over a [`Session`] and waits for their replies
///
/// The waiter is registered before the command is written, so a reply that
/// races the write still finds it. Replies to set, trigger and group set
/// cannot be told apart, so only one command of each kind is in flight at a
/// time; later callers queue on that kind's lock.
pub struct CommandRouter {
    session: Arc<Session>,
    pending: Arc<PendingRequests>,
    device_set: Mutex<()>,
    scene_trigger: Mutex<()>,
    group_set: Mutex<()>,
    timeout: Option<Duration>,
}

impl CommandRouter {
    pub(crate) fn new(
        session: Arc<Session>,
        pending: Arc<PendingRequests>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            pending,
            device_set: Mutex::new(()),
            scene_trigger: Mutex::new(()),
            group_set: Mutex::new(()),
            timeout,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Write `property` under `action` on a device endpoint
    pub async fn set_device_property(
        &self,
        device_id: &str,
        endpoint: u32,
        action: &str,
        property: Value,
    ) -> GatewayResult<Value> {
        debug!(device_id, endpoint, action, "setting device property");
        let command = commands::device_set(device_id, endpoint, action, property);
        self.complete(OperationKind::DeviceSet, &command).await
    }

    /// Write a typed value to a device endpoint
    pub async fn set_device_value(
        &self,
        device_id: &str,
        endpoint: u32,
        value: &PropertyValue,
    ) -> GatewayResult<Value> {
        debug!(device_id, endpoint, action = value.action(), "setting device value");
        let command = commands::device_set_value(device_id, endpoint, value);
        self.complete(OperationKind::DeviceSet, &command).await
    }

    /// Read one action's properties from a device endpoint
    ///
    /// Concurrent reads of the same key are answered in the order they were
    /// sent.
    pub async fn get_device_property(
        &self,
        device_id: &str,
        endpoint: u32,
        action: &str,
    ) -> GatewayResult<PropertyReport> {
        let key = PropertyKey::new(device_id, endpoint, action);
        let reply = self.pending.register_get(key);
        // A failed write leaves a dead waiter that the next reply skips
        self.session
            .send_command(&commands::device_get(device_id, endpoint, action))
            .await?;
        self.wait(reply).await
    }

    pub async fn trigger_scene(&self, scene_id: u32) -> GatewayResult<Value> {
        debug!(scene_id, "triggering scene");
        self.complete(OperationKind::SceneTrigger, &commands::scene_trigger(scene_id))
            .await
    }

    /// Write `property` under `action` to every member of a group
    pub async fn set_group_property(
        &self,
        group_id: u32,
        action: &str,
        property: Value,
    ) -> GatewayResult<Value> {
        debug!(group_id, action, "setting group property");
        let command = commands::group_set(group_id, action, property);
        self.complete(OperationKind::GroupSet, &command).await
    }

    fn lock_for(&self, kind: OperationKind) -> &Mutex<()> {
        match kind {
            OperationKind::DeviceSet => &self.device_set,
            OperationKind::SceneTrigger => &self.scene_trigger,
            OperationKind::GroupSet => &self.group_set,
        }
    }

    async fn complete(&self, kind: OperationKind, command: &Message) -> GatewayResult<Value> {
        let _in_flight = self.lock_for(kind).lock().await;
        let reply = self.pending.register_completion(kind);
        if let Err(err) = self.session.send_command(command).await {
            self.pending.cancel_completion(kind);
            return Err(err.into());
        }
        let result = self.wait(reply).await;
        if result.is_err() {
            self.pending.cancel_completion(kind);
        }
        result
    }

    async fn wait<T>(&self, reply: oneshot::Receiver<T>) -> GatewayResult<T> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, reply).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(_)) => Err(GatewayError::ConnectionLost),
                Err(_) => Err(GatewayError::Timeout(limit)),
            },
            None => reply.await.map_err(|_| GatewayError::ConnectionLost),
        }
    }
}
