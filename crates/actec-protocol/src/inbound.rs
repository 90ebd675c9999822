//! Classification of messages received from the hub
//!
//! The hub identifies a message by its `(namespace, response, type)` triple.
//! [`Inbound::classify`] turns that triple into a closed set of variants so
//! dispatch can be matched exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::{namespaces, verbs, DEVICE_PROPERTY};
use crate::message::Message;
use crate::property::PropertyValue;
use crate::topology::Report;

/// Correlation key for a device property read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub device_id: String,
    pub endpoint: u32,
    pub action: String,
}

impl PropertyKey {
    pub fn new(device_id: impl Into<String>, endpoint: u32, action: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            endpoint,
            action: action.into(),
        }
    }
}

/// Body of a property push or a property `get` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReport {
    pub device_id: String,
    pub endpoint: u32,
    pub action: String,
    #[serde(default)]
    pub property: Value,
}

impl PropertyReport {
    pub fn key(&self) -> PropertyKey {
        PropertyKey::new(self.device_id.clone(), self.endpoint, self.action.clone())
    }

    /// Typed view of the reported property, if the action is modelled
    pub fn value(&self) -> Option<PropertyValue> {
        PropertyValue::from_property(&self.action, &self.property)
    }
}

/// Operations that have a single outstanding completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    DeviceSet,
    SceneTrigger,
    GroupSet,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::DeviceSet => "device_set",
            OperationKind::SceneTrigger => "scene_trigger",
            OperationKind::GroupSet => "group_set",
        }
    }
}

/// A classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Unsolicited property push from a device
    DeviceProperty(PropertyReport),
    /// Reply to a device property `get`
    DeviceGetReply(PropertyReport),
    /// Reply to a device set, scene trigger or group set
    Completion { kind: OperationKind, body: Value },
    /// Keepalive acknowledgement
    Pong,
    /// Topology report
    Report(Report),
    /// Anything this client does not understand
    Unhandled(Message),
}

impl Inbound {
    /// Classify a decoded message
    pub fn classify(message: Message) -> Self {
        let namespace = message.header.namespace.clone();
        let response = message.header.response.clone();
        let kind = message.header.kind.clone();
        let success = message.header.success.unwrap_or(false);

        match (namespace.as_str(), response.as_deref(), kind.as_deref()) {
            (namespaces::DEVICE_CONTROL, _, Some(DEVICE_PROPERTY)) => {
                match message.body_as::<PropertyReport>() {
                    Ok(report) => Inbound::DeviceProperty(report),
                    Err(_) => Inbound::Unhandled(message),
                }
            }
            (namespaces::DEVICE_CONTROL, Some(verbs::GET), _) => {
                match message.body_as::<PropertyReport>() {
                    Ok(report) => Inbound::DeviceGetReply(report),
                    Err(_) => Inbound::Unhandled(message),
                }
            }
            (namespaces::DEVICE_CONTROL, Some(verbs::SET), _) => {
                Self::completion(OperationKind::DeviceSet, message)
            }
            (namespaces::SCENE_CONTROL, Some(verbs::TRIGGER), _) => {
                Self::completion(OperationKind::SceneTrigger, message)
            }
            (namespaces::GROUP_CONTROL, Some(verbs::SET), _) => {
                Self::completion(OperationKind::GroupSet, message)
            }
            (namespaces::SYSTEM, Some(verbs::PING), _) => Inbound::Pong,
            (namespaces::HA, Some(verbs::GET), _) => Inbound::Report(Report {
                success,
                body: message.body,
            }),
            _ => Inbound::Unhandled(message),
        }
    }

    fn completion(kind: OperationKind, message: Message) -> Self {
        Inbound::Completion {
            kind,
            body: message.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(value: Value) -> Inbound {
        Inbound::classify(Message::from_value(value))
    }

    #[test]
    fn test_property_push() {
        let inbound = classify(json!([
            {"namespace": "device_control", "type": "device_property"},
            {"device_id": "d1", "endpoint": 2, "action": "onoff", "property": {"onoff": 1}}
        ]));
        match inbound {
            Inbound::DeviceProperty(report) => {
                assert_eq!(report.key(), PropertyKey::new("d1", 2, "onoff"));
                assert_eq!(report.value(), Some(PropertyValue::OnOff(true)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_get_reply() {
        let inbound = classify(json!([
            {"namespace": "device_control", "response": "get", "success": true},
            {"device_id": "d1", "endpoint": 1, "action": "position", "property": {"position": 30}}
        ]));
        assert!(matches!(inbound, Inbound::DeviceGetReply(r) if r.endpoint == 1));
    }

    #[test]
    fn test_completions() {
        let set = classify(json!([{"namespace": "device_control", "response": "set"}, {"ok": 1}]));
        assert_eq!(
            set,
            Inbound::Completion {
                kind: OperationKind::DeviceSet,
                body: json!({"ok": 1})
            }
        );
        let trigger = classify(json!([{"namespace": "scene_control", "response": "trigger"}, {}]));
        assert!(matches!(
            trigger,
            Inbound::Completion {
                kind: OperationKind::SceneTrigger,
                ..
            }
        ));
        let group = classify(json!([{"namespace": "group_control", "response": "set"}]));
        assert!(matches!(
            group,
            Inbound::Completion {
                kind: OperationKind::GroupSet,
                ..
            }
        ));
    }

    #[test]
    fn test_pong_and_report() {
        assert_eq!(
            classify(json!([{"namespace": "system", "response": "ping"}, {}])),
            Inbound::Pong
        );
        let report = classify(json!([{"namespace": "ha", "response": "get", "success": false}]));
        assert!(matches!(report, Inbound::Report(r) if !r.success));
    }

    #[test]
    fn test_unknown_and_malformed_are_unhandled() {
        assert!(matches!(
            classify(json!([{"namespace": "firmware", "response": "upgrade"}, {}])),
            Inbound::Unhandled(_)
        ));
        assert!(matches!(
            classify(json!([
                {"namespace": "device_control", "type": "device_property"},
                {"endpoint": 2}
            ])),
            Inbound::Unhandled(_)
        ));
        assert!(matches!(classify(json!(["header", {}])), Inbound::Unhandled(_)));
        assert!(matches!(classify(json!("text")), Inbound::Unhandled(_)));
    }

    #[test]
    fn test_mistyped_success_still_classifies() {
        assert_eq!(
            classify(json!([{"namespace": "system", "response": "ping", "success": 1}, {}])),
            Inbound::Pong
        );
    }
}
