//! The gateway: session, registries and the receive loop

use std::pin::pin;
use std::sync::{Arc, OnceLock, Weak};

use actec_client::{ClientConfig, ConnectionState, Session};
use actec_protocol::topology::FloorInfo;
use actec_protocol::{commands, AreaNameRule, Inbound, Message, PropertyReport, Report};
use futures::StreamExt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::device::Device;
use crate::error::{GatewayError, GatewayResult};
use crate::group::Group;
use crate::pending::PendingRequests;
use crate::router::CommandRouter;
use crate::scene::Scene;

/// Devices, scenes and groups reported by the gateway
///
/// Loaded once per gateway; a changed topology requires a new [`Gateway`].
#[derive(Debug, Default)]
pub struct Topology {
    devices: IndexMap<String, Arc<Device>>,
    scenes: IndexMap<u32, Arc<Scene>>,
    groups: IndexMap<u32, Arc<Group>>,
}

impl Topology {
    fn build(
        floors: &[FloorInfo],
        rule: AreaNameRule,
        mac: &str,
        router: &Arc<CommandRouter>,
    ) -> Self {
        let mut topology = Topology::default();
        for floor in floors {
            for room in &floor.rooms {
                let area = rule.suggested_area(&floor.floor_name, &room.name);
                for info in &room.devices {
                    let device = Device::new(info.clone(), area.clone(), Arc::clone(router));
                    topology
                        .devices
                        .insert(info.device_id.clone(), Arc::new(device));
                }
                for info in &room.scenes {
                    let room_name = format!("{} {}", floor.floor_name, room.name);
                    let scene =
                        Scene::new(info.clone(), mac, room_name, area.clone(), Arc::clone(router));
                    topology.scenes.insert(info.scene_id, Arc::new(scene));
                }
                for info in &room.groups {
                    let group = Group::new(info.clone(), mac, area.clone(), Arc::clone(router));
                    topology.groups.insert(info.group_id, Arc::new(group));
                }
            }
        }
        topology
    }

    fn set_available(&self, available: bool) {
        for device in self.devices.values() {
            device.set_available(available);
        }
        for scene in self.scenes.values() {
            scene.set_available(available);
        }
        for group in self.groups.values() {
            group.set_available(available);
        }
    }
}

/// A connection to one AcTEC gateway and everything it reported
pub struct Gateway {
    mac: String,
    session: Arc<Session>,
    router: Arc<CommandRouter>,
    topology: Arc<OnceLock<Topology>>,
}

impl Gateway {
    pub fn new(config: ClientConfig, mac: impl Into<String>) -> Self {
        let topology = Arc::new(OnceLock::new());
        let pending = Arc::new(PendingRequests::default());
        let timeout = config.command_timeout;

        let session = Arc::new(Session::with_state_listener(config, {
            let topology = Arc::downgrade(&topology);
            let pending = Arc::clone(&pending);
            move |state| on_state_changed(&topology, &pending, state)
        }));
        let router = Arc::new(CommandRouter::new(Arc::clone(&session), pending, timeout));

        Self {
            mac: mac.into(),
            session,
            router,
            topology,
        }
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn available(&self) -> bool {
        self.session.available()
    }

    pub async fn connect(&self) -> GatewayResult<()> {
        Ok(self.session.connect().await?)
    }

    /// Request the topology report
    ///
    /// Reads the reply straight off the connection, so it must run before
    /// [`Gateway::run`] starts.
    pub async fn get_report(&self) -> GatewayResult<Report> {
        let reply = self.session.request(&commands::report_request()).await?;
        if reply.header.namespace != commands::namespaces::HA {
            warn!(reply = %reply, "unexpected reply to the report request");
        }
        Ok(Report {
            success: reply.header.success.unwrap_or(false),
            body: reply.body,
        })
    }

    /// Build the device, scene and group registries from the reported floors
    pub fn init_devices(&self, floors: &[FloorInfo], rule: AreaNameRule) -> GatewayResult<()> {
        debug!(%rule, "loading gateway topology");
        let topology = Topology::build(floors, rule, &self.mac, &self.router);
        let (devices, scenes, groups) = (
            topology.devices.len(),
            topology.scenes.len(),
            topology.groups.len(),
        );
        self.topology
            .set(topology)
            .map_err(|_| GatewayError::TopologyAlreadyLoaded)?;

        if let Some(topology) = self.topology.get() {
            topology.set_available(self.available());
        }
        info!(devices, scenes, groups, "gateway topology loaded");
        Ok(())
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.get()
    }

    pub fn device(&self, device_id: &str) -> Option<&Arc<Device>> {
        self.topology.get()?.devices.get(device_id)
    }

    pub fn scene(&self, scene_id: u32) -> Option<&Arc<Scene>> {
        self.topology.get()?.scenes.get(&scene_id)
    }

    pub fn group(&self, group_id: u32) -> Option<&Arc<Group>> {
        self.topology.get()?.groups.get(&group_id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> + '_ {
        self.topology
            .get()
            .into_iter()
            .flat_map(|topology| topology.devices.values())
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Arc<Scene>> + '_ {
        self.topology
            .get()
            .into_iter()
            .flat_map(|topology| topology.scenes.values())
    }

    pub fn groups(&self) -> impl Iterator<Item = &Arc<Group>> + '_ {
        self.topology
            .get()
            .into_iter()
            .flat_map(|topology| topology.groups.values())
    }

    /// Receive and dispatch frames until the session closes
    ///
    /// Returns an error only when the session hit an unrecoverable error;
    /// the gateway has to be set up again after that.
    pub async fn run(&self) -> GatewayResult<()> {
        debug!("receive loop started");
        let mut responses = pin!(self.session.responses());
        while let Some(item) = responses.next().await {
            match item {
                Ok(message) => self.dispatch(message),
                Err(err) => {
                    error!(%err, "receive loop stopped, the gateway must be reloaded");
                    return Err(err.into());
                }
            }
        }
        debug!("session closed, receive loop finished");
        Ok(())
    }

    /// Route one inbound message
    pub fn dispatch(&self, message: Message) {
        match Inbound::classify(message) {
            Inbound::DeviceProperty(report) => match self.device(&report.device_id) {
                Some(device) => device.update_property(&report),
                None => warn!(device_id = %report.device_id, "property report for unknown device"),
            },
            Inbound::DeviceGetReply(report) => self.on_get_reply(report),
            Inbound::Completion { kind, body } => {
                if !self.router.pending().resolve_completion(kind, body) {
                    warn!(kind = kind.as_str(), "reply with no pending request");
                }
            }
            Inbound::Pong => {}
            Inbound::Report(report) => {
                warn!(success = report.success, "unsolicited topology report ignored");
            }
            Inbound::Unhandled(message) => warn!(%message, "unhandled message"),
        }
    }

    fn on_get_reply(&self, report: PropertyReport) {
        let device = self.device(&report.device_id).cloned();
        let forwarded = report.clone();
        if !self.router.pending().resolve_get(report) {
            warn!(
                device_id = %forwarded.device_id,
                endpoint = forwarded.endpoint,
                action = %forwarded.action,
                "get reply with no pending request"
            );
            return;
        }
        if let Some(device) = device {
            device.update_property(&forwarded);
        }
    }

    /// Ping the gateway until the session closes
    pub async fn run_ping_loop(&self) {
        self.session.run_ping_loop().await
    }

    /// Reconnect if the gateway hung up shortly after login
    pub async fn ensure_alive(&self) -> GatewayResult<()> {
        Ok(self.session.ensure_alive().await?)
    }

    /// Close the session for good; both loops finish
    pub async fn close(&self) {
        self.session.close(false).await
    }

    pub async fn set_device_property(
        &self,
        device_id: &str,
        endpoint: u32,
        action: &str,
        property: Value,
    ) -> GatewayResult<Value> {
        self.router
            .set_device_property(device_id, endpoint, action, property)
            .await
    }

    pub async fn get_device_property(
        &self,
        device_id: &str,
        endpoint: u32,
        action: &str,
    ) -> GatewayResult<PropertyReport> {
        self.router
            .get_device_property(device_id, endpoint, action)
            .await
    }

    pub async fn trigger_scene(&self, scene_id: u32) -> GatewayResult<Value> {
        self.router.trigger_scene(scene_id).await
    }

    pub async fn set_group_property(
        &self,
        group_id: u32,
        action: &str,
        property: Value,
    ) -> GatewayResult<Value> {
        self.router
            .set_group_property(group_id, action, property)
            .await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("mac", &self.mac)
            .field("session", &self.session)
            .field("topology", &self.topology.get())
            .finish()
    }
}

fn on_state_changed(
    topology: &Weak<OnceLock<Topology>>,
    pending: &PendingRequests,
    state: ConnectionState,
) {
    let available = state.is_available();
    if !available {
        let dropped = pending.fail_all();
        if dropped > 0 {
            warn!(dropped, %state, "connection lost with requests pending");
        }
    }
    if let Some(topology) = topology.upgrade() {
        if let Some(topology) = topology.get() {
            topology.set_available(available);
        }
    }
}
