//! Outbound command construction

use serde_json::{json, Value};

use crate::message::Message;
use crate::property::PropertyValue;

/// Protocol namespaces
pub mod namespaces {
    pub const SYSTEM: &str = "system";
    pub const HA: &str = "ha";
    pub const DEVICE_CONTROL: &str = "device_control";
    pub const SCENE_CONTROL: &str = "scene_control";
    pub const GROUP_CONTROL: &str = "group_control";
}

/// Command and response verbs
pub mod verbs {
    pub const PING: &str = "ping";
    pub const GET: &str = "get";
    pub const SET: &str = "set";
    pub const TRIGGER: &str = "trigger";
}

/// Push message type for device property reports
pub const DEVICE_PROPERTY: &str = "device_property";

/// Action requesting the topology report
pub const REPORT_ACTION: &str = "report";

/// Keepalive heartbeat
pub fn ping() -> Message {
    Message::command(namespaces::SYSTEM, verbs::PING, json!({}))
}

/// Topology request sent once during bootstrap
pub fn report_request() -> Message {
    Message::command(namespaces::HA, verbs::GET, json!({ "action": REPORT_ACTION }))
}

/// Read one action's properties from a device endpoint
pub fn device_get(device_id: &str, endpoint: u32, action: &str) -> Message {
    Message::command(
        namespaces::DEVICE_CONTROL,
        verbs::GET,
        json!({
            "device_id": device_id,
            "endpoint": endpoint,
            "action": action,
        }),
    )
}

/// Write a property to a device endpoint
pub fn device_set(device_id: &str, endpoint: u32, action: &str, property: Value) -> Message {
    Message::command(
        namespaces::DEVICE_CONTROL,
        verbs::SET,
        json!({
            "device_id": device_id,
            "endpoint": endpoint,
            "action": action,
            "property": property,
        }),
    )
}

/// Write a typed property value to a device endpoint
pub fn device_set_value(device_id: &str, endpoint: u32, value: &PropertyValue) -> Message {
    device_set(device_id, endpoint, value.action(), value.to_property())
}

/// Trigger a scene
pub fn scene_trigger(scene_id: u32) -> Message {
    Message::command(
        namespaces::SCENE_CONTROL,
        verbs::TRIGGER,
        json!({ "scene_id": scene_id }),
    )
}

/// Write a property to every member of a group
pub fn group_set(group_id: u32, action: &str, property: Value) -> Message {
    Message::command(
        namespaces::GROUP_CONTROL,
        verbs::SET,
        json!({
            "group_id": group_id,
            "action": action,
            "property": property,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_request() {
        let msg = report_request();
        assert_eq!(
            String::from_utf8(msg.to_vec().unwrap()).unwrap(),
            r#"[{"namespace":"ha","command":"get"},{"action":"report"}]"#
        );
    }

    #[test]
    fn test_device_set_value() {
        let msg = device_set_value("dev-1", 2, &PropertyValue::Position(40));
        assert_eq!(msg.header.namespace, "device_control");
        assert_eq!(msg.header.command.as_deref(), Some("set"));
        assert_eq!(
            msg.body,
            json!({"device_id": "dev-1", "endpoint": 2, "action": "position", "property": {"position": 40}})
        );
    }

    #[test]
    fn test_scene_and_group_commands() {
        assert_eq!(scene_trigger(7).body, json!({"scene_id": 7}));
        let msg = group_set(3, "onoff", json!({"onoff": 0}));
        assert_eq!(msg.header.namespace, "group_control");
        assert_eq!(msg.body["group_id"], 3);
    }
}
