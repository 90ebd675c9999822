//! Groups of devices driven together

use std::sync::Arc;

use actec_protocol::topology::{GroupInfo, GroupType};
use actec_protocol::PropertyValue;
use serde_json::Value;

use crate::error::GatewayResult;
use crate::listeners::Unsubscribe;
use crate::router::CommandRouter;
use crate::unit::Availability;

/// A device group configured on the gateway
pub struct Group {
    info: GroupInfo,
    unique_id: String,
    suggested_area: Option<String>,
    availability: Availability,
    router: Arc<CommandRouter>,
}

impl Group {
    pub(crate) fn new(
        info: GroupInfo,
        mac: &str,
        suggested_area: Option<String>,
        router: Arc<CommandRouter>,
    ) -> Self {
        Self {
            unique_id: format!("{}_group_{}", mac.replace(':', ""), info.group_id),
            info,
            suggested_area,
            availability: Availability::default(),
            router,
        }
    }

    pub fn group_id(&self) -> u32 {
        self.info.group_id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn group_type(&self) -> GroupType {
        self.info.group_type
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
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

    /// Write a typed value to every member
    pub async fn set_property(&self, value: PropertyValue) -> GatewayResult<Value> {
        self.router
            .set_group_property(self.info.group_id, value.action(), value.to_property())
            .await
    }

    pub async fn set_on_off(&self, on: bool) -> GatewayResult<Value> {
        self.set_property(PropertyValue::OnOff(on)).await
    }

    pub async fn set_brightness(&self, brightness: f64) -> GatewayResult<Value> {
        self.set_property(PropertyValue::Level(brightness)).await
    }

    pub async fn set_color_temp(&self, kelvin: u32) -> GatewayResult<Value> {
        self.set_property(PropertyValue::ColorTemp(kelvin)).await
    }

    pub async fn set_hsv(&self, hue: u16, saturation: u16, value: u16) -> GatewayResult<Value> {
        self.set_property(PropertyValue::Hsv {
            hue,
            saturation,
            value,
        })
        .await
    }

    pub async fn set_position(&self, position: u8) -> GatewayResult<Value> {
        self.set_property(PropertyValue::Position(position)).await
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("group_id", &self.info.group_id)
            .field("name", &self.info.name)
            .field("group_type", &self.info.group_type)
            .finish()
    }
}
