//! Device property actions and typed values

use serde_json::{json, Map, Value};

/// Action names exchanged with devices and groups
pub mod actions {
    pub const ONOFF: &str = "onoff";
    pub const LEVEL: &str = "level";
    pub const COLOR_TEMP: &str = "cw";
    pub const HSV: &str = "hsv";
    pub const POSITION: &str = "position";
}

/// Property keys inside an action's `property` object
pub mod props {
    pub const ONOFF: &str = "onoff";
    pub const LEVEL: &str = "level";
    pub const COLOR_TEMP: &str = "cw";
    pub const HUE: &str = "h";
    pub const SATURATION: &str = "s";
    pub const VALUE: &str = "v";
    pub const POSITION: &str = "position";
}

/// A value that can be written to a device endpoint or group
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    /// Switch state
    OnOff(bool),
    /// Brightness, 0.0 to 100.0
    Level(f64),
    /// Color temperature in kelvin, 2700 to 6500
    ColorTemp(u32),
    /// Hue 0-360, saturation and value 0-1000
    Hsv {
        hue: u16,
        saturation: u16,
        value: u16,
    },
    /// Cover position, 0 to 100
    Position(u8),
}

impl PropertyValue {
    /// The wire action this value is sent under
    pub fn action(&self) -> &'static str {
        match self {
            PropertyValue::OnOff(_) => actions::ONOFF,
            PropertyValue::Level(_) => actions::LEVEL,
            PropertyValue::ColorTemp(_) => actions::COLOR_TEMP,
            PropertyValue::Hsv { .. } => actions::HSV,
            PropertyValue::Position(_) => actions::POSITION,
        }
    }

    /// The `property` object for a `set` command
    pub fn to_property(&self) -> Value {
        match *self {
            PropertyValue::OnOff(on) => object([(props::ONOFF, json!(u8::from(on)))]),
            PropertyValue::Level(level) => object([(props::LEVEL, json!(level))]),
            PropertyValue::ColorTemp(kelvin) => object([(props::COLOR_TEMP, json!(kelvin))]),
            PropertyValue::Hsv {
                hue,
                saturation,
                value,
            } => object([
                (props::HUE, json!(hue)),
                (props::SATURATION, json!(saturation)),
                (props::VALUE, json!(value)),
            ]),
            PropertyValue::Position(position) => object([(props::POSITION, json!(position))]),
        }
    }

    /// Interpret a reported `property` object for a known action
    ///
    /// Returns `None` for actions this type does not model or when a
    /// required key is missing.
    pub fn from_property(action: &str, property: &Value) -> Option<Self> {
        let uint = |key: &str| property.get(key).and_then(Value::as_u64);
        match action {
            actions::ONOFF => uint(props::ONOFF).map(|v| PropertyValue::OnOff(v != 0)),
            actions::LEVEL => property
                .get(props::LEVEL)
                .and_then(Value::as_f64)
                .map(PropertyValue::Level),
            actions::COLOR_TEMP => uint(props::COLOR_TEMP)
                .and_then(|v| u32::try_from(v).ok())
                .map(PropertyValue::ColorTemp),
            actions::HSV => Some(PropertyValue::Hsv {
                hue: u16::try_from(uint(props::HUE)?).ok()?,
                saturation: u16::try_from(uint(props::SATURATION)?).ok()?,
                value: u16::try_from(uint(props::VALUE)?).ok()?,
            }),
            actions::POSITION => uint(props::POSITION)
                .and_then(|v| u8::try_from(v).ok())
                .map(PropertyValue::Position),
            _ => None,
        }
    }
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect::<Map<String, Value>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_off_is_sent_as_integer() {
        assert_eq!(PropertyValue::OnOff(true).to_property(), json!({"onoff": 1}));
        assert_eq!(PropertyValue::OnOff(false).to_property(), json!({"onoff": 0}));
    }

    #[test]
    fn test_hsv_property() {
        let value = PropertyValue::Hsv {
            hue: 120,
            saturation: 500,
            value: 1000,
        };
        assert_eq!(value.action(), "hsv");
        assert_eq!(value.to_property(), json!({"h": 120, "s": 500, "v": 1000}));
    }

    #[test]
    fn test_from_property() {
        assert_eq!(
            PropertyValue::from_property("onoff", &json!({"onoff": 1})),
            Some(PropertyValue::OnOff(true))
        );
        assert_eq!(
            PropertyValue::from_property("level", &json!({"level": 42.5})),
            Some(PropertyValue::Level(42.5))
        );
        assert_eq!(
            PropertyValue::from_property("position", &json!({"position": 80})),
            Some(PropertyValue::Position(80))
        );
        assert_eq!(PropertyValue::from_property("hsv", &json!({"h": 1})), None);
        assert_eq!(PropertyValue::from_property("sensor", &json!({})), None);
    }
}
