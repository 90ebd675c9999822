//! Devices and their endpoint listeners

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use actec_protocol::topology::{DeviceInfo, ProductMode};
use actec_protocol::{PropertyReport, PropertyValue};
use serde_json::Value;
use tracing::debug;

use crate::error::GatewayResult;
use crate::listeners::{ListenerSet, Unsubscribe};
use crate::router::CommandRouter;
use crate::unit::Availability;

/// A device reported by the gateway
pub struct Device {
    info: DeviceInfo,
    suggested_area: Option<String>,
    availability: Availability,
    endpoints: Mutex<HashMap<u32, Arc<ListenerSet<PropertyReport>>>>,
    router: Arc<CommandRouter>,
}

impl Device {
    pub(crate) fn new(
        info: DeviceInfo,
        suggested_area: Option<String>,
        router: Arc<CommandRouter>,
    ) -> Self {
        Self {
            info,
            suggested_area,
            availability: Availability::default(),
            endpoints: Mutex::new(HashMap::new()),
            router,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.info.device_id
    }

    /// Devices are identified by their gateway-assigned id
    pub fn unique_id(&self) -> &str {
        &self.info.device_id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn product_key(&self) -> &str {
        &self.info.product_key
    }

    pub fn product_mode(&self) -> Option<ProductMode> {
        self.info.product_mode
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
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

    /// Be told about every property report for `endpoint`
    pub fn add_listener<F>(&self, endpoint: u32, callback: F) -> Unsubscribe
    where
        F: Fn(&PropertyReport) + Send + Sync + 'static,
    {
        let set = Arc::clone(
            self.endpoints
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(endpoint)
                .or_default(),
        );
        set.add(callback)
    }

    /// Deliver a property report to the endpoint's listeners
    pub fn update_property(&self, report: &PropertyReport) {
        debug!(
            device_id = %self.info.device_id,
            endpoint = report.endpoint,
            property = %report.property,
            "device property reported"
        );
        let set = self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&report.endpoint)
            .cloned();
        if let Some(set) = set {
            set.notify(report);
        }
    }

    /// Ask the device for its current `action` properties
    ///
    /// The reply also reaches the endpoint's listeners.
    pub async fn fetch_property(&self, endpoint: u32, action: &str) -> GatewayResult<PropertyReport> {
        self.router
            .get_device_property(&self.info.device_id, endpoint, action)
            .await
    }

    /// Write a typed value to an endpoint
    pub async fn set_property(&self, endpoint: u32, value: PropertyValue) -> GatewayResult<Value> {
        self.router
            .set_device_value(&self.info.device_id, endpoint, &value)
            .await
    }

    pub async fn set_on_off(&self, endpoint: u32, on: bool) -> GatewayResult<Value> {
        self.set_property(endpoint, PropertyValue::OnOff(on)).await
    }

    /// Brightness from 0.0 to 100.0
    pub async fn set_brightness(&self, endpoint: u32, brightness: f64) -> GatewayResult<Value> {
        self.set_property(endpoint, PropertyValue::Level(brightness))
            .await
    }

    /// Color temperature in kelvin, 2700 to 6500
    pub async fn set_color_temp(&self, endpoint: u32, kelvin: u32) -> GatewayResult<Value> {
        self.set_property(endpoint, PropertyValue::ColorTemp(kelvin))
            .await
    }

    /// Hue 0-360, saturation and value 0-1000
    pub async fn set_hsv(
        &self,
        endpoint: u32,
        hue: u16,
        saturation: u16,
        value: u16,
    ) -> GatewayResult<Value> {
        self.set_property(
            endpoint,
            PropertyValue::Hsv {
                hue,
                saturation,
                value,
            },
        )
        .await
    }

    /// Cover position from 0 (closed) to 100 (open)
    pub async fn set_position(&self, endpoint: u32, position: u8) -> GatewayResult<Value> {
        self.set_property(endpoint, PropertyValue::Position(position))
            .await
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("device_id", &self.info.device_id)
            .field("name", &self.info.name)
            .field("product_key", &self.info.product_key)
            .field("product_mode", &self.info.product_mode)
            .finish()
    }
}
