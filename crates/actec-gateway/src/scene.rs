//! Scenes

use std::sync::Arc;

use actec_protocol::topology::SceneInfo;
use serde_json::Value;

use crate::error::GatewayResult;
use crate::listeners::Unsubscribe;
use crate::router::CommandRouter;
use crate::unit::Availability;

/// A scene configured on the gateway
pub struct Scene {
    info: SceneInfo,
    unique_id: String,
    room_name: String,
    suggested_area: Option<String>,
    availability: Availability,
    router: Arc<CommandRouter>,
}

impl Scene {
    pub(crate) fn new(
        info: SceneInfo,
        mac: &str,
        room_name: String,
        suggested_area: Option<String>,
        router: Arc<CommandRouter>,
    ) -> Self {
        Self {
            unique_id: format!("{}_scene_{}", mac.replace(':', ""), info.scene_id),
            info,
            room_name,
            suggested_area,
            availability: Availability::default(),
            router,
        }
    }

    pub fn scene_id(&self) -> u32 {
        self.info.scene_id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// "{floor} {room}" regardless of the area naming rule
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn suggested_area(&self) -> Option<&str> {
        self.suggested_area.as_deref()
    }

    pub fn available(&self) -> bool {
        self.availability.get()
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    pub fn add_available_listener<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.availability.add_listener(callback)
    }

    pub async fn trigger_scene(&self) -> GatewayResult<Value> {
        self.router.trigger_scene(self.info.scene_id).await
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("scene_id", &self.info.scene_id)
            .field("name", &self.info.name)
            .field("room_name", &self.room_name)
            .finish()
    }
}
