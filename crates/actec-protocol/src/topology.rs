//! Topology payload reported by the hub
//!
//! The bootstrap reply nests devices, scenes and groups under rooms, and
//! rooms under floors:
//!
//! ```text
//! integrated_list: [ { floor_name, rooms: [ { name, devices, scenes, groups } ] } ]
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Key of the floor list inside the report body
pub const INTEGRATED_LIST: &str = "integrated_list";

/// Errors extracting topology from a report
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("report body has no `integrated_list`")]
    MissingList,

    #[error("malformed topology: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Reply to the bootstrap topology request
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Whether the user authorized this client in the vendor app
    pub success: bool,
    pub body: Value,
}

impl Report {
    /// Extract the floor list
    pub fn floors(&self) -> Result<Vec<FloorInfo>, TopologyError> {
        let list = self
            .body
            .get(INTEGRATED_LIST)
            .ok_or(TopologyError::MissingList)?;
        Ok(Vec::<FloorInfo>::deserialize(list)?)
    }
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "u32", into = "u32")]
        pub enum $name {
            $($variant,)+
            /// A code this client does not know
            Other(u32),
        }

        impl From<u32> for $name {
            fn from(code: u32) -> Self {
                match code {
                    $($code => $name::$variant,)+
                    other => $name::Other(other),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                match value {
                    $($name::$variant => $code,)+
                    $name::Other(other) => other,
                }
            }
        }
    };
}

coded_enum! {
    /// Capability class of a device
    ProductMode {
        OnOff = 1,
        Brightness = 2,
        Rgb = 3,
        RgbColorTemp = 4,
        ColorTemp = 5,
        Curtain = 6,
        Key = 7,
        Sensor = 8,
    }
}

coded_enum! {
    /// Capability class of a group
    GroupType {
        OnOff = 1,
        Brightness = 2,
        ColorTemp = 3,
        RgbColorTemp = 4,
        Curtain = 5,
    }
}

coded_enum! {
    /// Behaviour of a key-type device
    ProductKeyType {
        PushButton = 0,
        SingleSwitch = 1,
    }
}

/// A device as reported in the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub device_id: String,
    pub product_key: String,
    #[serde(default)]
    pub product_mode: Option<ProductMode>,
    #[serde(default)]
    pub product_channel: Option<u32>,
    #[serde(default)]
    pub product_key_type: Option<ProductKeyType>,
}

/// A scene as reported in the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub name: String,
    pub scene_id: u32,
}

/// A group as reported in the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: String,
    pub group_id: u32,
    pub group_type: GroupType,
}

/// A room and everything configured in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
    #[serde(default)]
    pub scenes: Vec<SceneInfo>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
}

/// A floor and its rooms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorInfo {
    pub floor_name: String,
    #[serde(default)]
    pub rooms: Vec<RoomInfo>,
}

/// How a unit's suggested area is derived from its floor and room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaNameRule {
    /// No suggested area
    None,
    /// "{floor} {room}"
    #[default]
    FloorRoom,
    /// "{room}"
    Room,
    /// "{floor}"
    Floor,
}

impl AreaNameRule {
    /// Compose the suggested area for a unit in `room` on `floor`
    pub fn suggested_area(&self, floor: &str, room: &str) -> Option<String> {
        match self {
            AreaNameRule::None => None,
            AreaNameRule::FloorRoom => Some(format!("{} {}", floor, room)),
            AreaNameRule::Room => Some(room.to_string()),
            AreaNameRule::Floor => Some(floor.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AreaNameRule::None => "none",
            AreaNameRule::FloorRoom => "floor_room",
            AreaNameRule::Room => "room",
            AreaNameRule::Floor => "floor",
        }
    }
}

impl fmt::Display for AreaNameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaNameRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AreaNameRule::None),
            "floor_room" => Ok(AreaNameRule::FloorRoom),
            "room" => Ok(AreaNameRule::Room),
            "floor" => Ok(AreaNameRule::Floor),
            other => Err(format!("unknown area name rule '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_area_name_rules() {
        assert_eq!(AreaNameRule::None.suggested_area("1F", "Living"), None);
        assert_eq!(
            AreaNameRule::FloorRoom.suggested_area("1F", "Living").as_deref(),
            Some("1F Living")
        );
        assert_eq!(
            AreaNameRule::Room.suggested_area("1F", "Living").as_deref(),
            Some("Living")
        );
        assert_eq!(
            AreaNameRule::Floor.suggested_area("1F", "Living").as_deref(),
            Some("1F")
        );
    }

    #[test]
    fn test_area_name_rule_parse() {
        for rule in [
            AreaNameRule::None,
            AreaNameRule::FloorRoom,
            AreaNameRule::Room,
            AreaNameRule::Floor,
        ] {
            assert_eq!(rule.as_str().parse::<AreaNameRule>(), Ok(rule));
        }
        assert!("kitchen".parse::<AreaNameRule>().is_err());
        assert_eq!(AreaNameRule::default(), AreaNameRule::FloorRoom);
    }

    #[test]
    fn test_report_floors() {
        let report = Report {
            success: true,
            body: json!({
                "integrated_list": [{
                    "floor_name": "1F",
                    "rooms": [{
                        "name": "Living",
                        "devices": [{
                            "name": "Ceiling",
                            "device_id": "00158d0001",
                            "product_key": "4100",
                            "product_mode": 5
                        }],
                        "scenes": [{"name": "Movie", "scene_id": 3}],
                        "groups": [{"name": "All lights", "group_id": 9, "group_type": 2}]
                    }]
                }]
            }),
        };
        let floors = report.floors().unwrap();
        let room = &floors[0].rooms[0];
        assert_eq!(room.devices[0].product_mode, Some(ProductMode::ColorTemp));
        assert_eq!(room.devices[0].product_key_type, None);
        assert_eq!(room.scenes[0].scene_id, 3);
        assert_eq!(room.groups[0].group_type, GroupType::Brightness);
    }

    #[test]
    fn test_report_without_list() {
        let report = Report {
            success: true,
            body: json!({}),
        };
        assert!(matches!(report.floors(), Err(TopologyError::MissingList)));
    }

    #[test]
    fn test_report_with_malformed_list() {
        let report = Report {
            success: true,
            body: json!({"integrated_list": [{"rooms": []}]}),
        };
        assert!(matches!(report.floors(), Err(TopologyError::Malformed(_))));
    }

    #[test]
    fn test_unknown_codes_are_kept() {
        let info: DeviceInfo = serde_json::from_value(json!({
            "name": "Odd",
            "device_id": "x",
            "product_key": "9999",
            "product_mode": 42
        }))
        .unwrap();
        assert_eq!(info.product_mode, Some(ProductMode::Other(42)));
        assert_eq!(u32::from(ProductMode::Other(42)), 42);
    }
}
