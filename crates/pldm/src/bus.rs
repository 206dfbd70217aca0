// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-bus seams.
//!
//! The responder talks to the platform's object bus in two directions:
//! emitting event signals ([`SignalSink`]) and reading/writing properties
//! backing sensors, effecters, and BIOS attributes ([`BusProperties`]). Both
//! stay behind traits; the bus daemon binding lives outside this crate.

use crate::error::{Error, Result};

/// A property address on the object bus.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct PropertyMapping {
    #[serde(rename = "object_path")]
    pub object_path: String,
    pub interface: String,
    #[serde(rename = "property_name")]
    pub property: String,
}

/// A property value as carried by the object bus.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    /// Build a value of the named bus type from a JSON scalar.
    ///
    /// The descriptor files state the property type as a string
    /// (`"uint8_t"`, `"string"`, ...); the JSON value is coerced to it.
    pub fn from_json(type_name: &str, value: &serde_json::Value) -> Result<Self> {
        let bad = || {
            Error::InvalidData(format!(
                "property value {} does not fit bus type {}",
                value, type_name
            ))
        };
        match type_name {
            "bool" => value.as_bool().map(PropertyValue::Bool).ok_or_else(bad),
            "uint8_t" => value
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .map(PropertyValue::U8)
                .ok_or_else(bad),
            "int16_t" => value
                .as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .map(PropertyValue::I16)
                .ok_or_else(bad),
            "uint16_t" => value
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .map(PropertyValue::U16)
                .ok_or_else(bad),
            "int32_t" => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(PropertyValue::I32)
                .ok_or_else(bad),
            "uint32_t" => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(PropertyValue::U32)
                .ok_or_else(bad),
            "int64_t" => value.as_i64().map(PropertyValue::I64).ok_or_else(bad),
            "uint64_t" => value.as_u64().map(PropertyValue::U64).ok_or_else(bad),
            "double" => value.as_f64().map(PropertyValue::Double).ok_or_else(bad),
            "string" => value
                .as_str()
                .map(|s| PropertyValue::String(s.to_string()))
                .ok_or_else(bad),
            other => Err(Error::InvalidData(format!(
                "unknown bus property type {}",
                other
            ))),
        }
    }
}

/// Property get/set surface of the object bus.
pub trait BusProperties {
    /// Read the current value of a mapped property.
    fn get(&self, mapping: &PropertyMapping) -> Result<PropertyValue>;

    /// Write a mapped property.
    fn set(&mut self, mapping: &PropertyMapping, value: PropertyValue) -> Result<()>;
}

/// Signals emitted toward the object bus.
pub trait SignalSink {
    fn state_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        sensor_offset: u8,
        event_state: u8,
        previous_event_state: u8,
    );

    fn numeric_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        event_state: u8,
        previous_event_state: u8,
        sensor_data_size: u8,
        present_reading: u32,
    );

    fn message_poll_event(
        &mut self,
        tid: u8,
        format_version: u8,
        event_id: u16,
        data_transfer_handle: u32,
    );
}

// ============================================================================
// TEST / STANDALONE DOUBLES
// ============================================================================

/// Bus double with a fixed property store. Reads miss with an error unless
/// seeded; writes are recorded.
#[derive(Debug, Default)]
pub struct FakeBus {
    pub properties: Vec<(PropertyMapping, PropertyValue)>,
    pub writes: Vec<(PropertyMapping, PropertyValue)>,
}

impl FakeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, mapping: PropertyMapping, value: PropertyValue) {
        self.properties.push((mapping, value));
    }
}

impl BusProperties for FakeBus {
    fn get(&self, mapping: &PropertyMapping) -> Result<PropertyValue> {
        self.properties
            .iter()
            .find(|(m, _)| m == mapping)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Error::InvalidData(format!("no such property {}", mapping.property)))
    }

    fn set(&mut self, mapping: &PropertyMapping, value: PropertyValue) -> Result<()> {
        self.writes.push((mapping.clone(), value));
        Ok(())
    }
}

/// Signal emitted by a handler, captured for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedSignal {
    StateSensor {
        tid: u8,
        sensor_id: u16,
        sensor_offset: u8,
        event_state: u8,
        previous_event_state: u8,
    },
    NumericSensor {
        tid: u8,
        sensor_id: u16,
        event_state: u8,
        previous_event_state: u8,
        sensor_data_size: u8,
        present_reading: u32,
    },
    MessagePoll {
        tid: u8,
        format_version: u8,
        event_id: u16,
        data_transfer_handle: u32,
    },
}

/// Signal sink double collecting every emission in order.
#[derive(Debug, Default)]
pub struct RecordingSignals {
    pub emitted: Vec<RecordedSignal>,
}

impl RecordingSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSink for RecordingSignals {
    fn state_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        sensor_offset: u8,
        event_state: u8,
        previous_event_state: u8,
    ) {
        self.emitted.push(RecordedSignal::StateSensor {
            tid,
            sensor_id,
            sensor_offset,
            event_state,
            previous_event_state,
        });
    }

    fn numeric_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        event_state: u8,
        previous_event_state: u8,
        sensor_data_size: u8,
        present_reading: u32,
    ) {
        self.emitted.push(RecordedSignal::NumericSensor {
            tid,
            sensor_id,
            event_state,
            previous_event_state,
            sensor_data_size,
            present_reading,
        });
    }

    fn message_poll_event(
        &mut self,
        tid: u8,
        format_version: u8,
        event_id: u16,
        data_transfer_handle: u32,
    ) {
        self.emitted.push(RecordedSignal::MessagePoll {
            tid,
            format_version,
            event_id,
            data_transfer_handle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_value_from_json() {
        assert_eq!(
            PropertyValue::from_json("uint8_t", &json!(7)).unwrap(),
            PropertyValue::U8(7)
        );
        assert_eq!(
            PropertyValue::from_json("string", &json!("On")).unwrap(),
            PropertyValue::String("On".to_string())
        );
        assert_eq!(
            PropertyValue::from_json("bool", &json!(true)).unwrap(),
            PropertyValue::Bool(true)
        );
        assert!(PropertyValue::from_json("uint8_t", &json!(300)).is_err());
        assert!(PropertyValue::from_json("quaternion", &json!(1)).is_err());
    }

    #[test]
    fn test_fake_bus_get_and_set() {
        let mapping = PropertyMapping {
            object_path: "/xyz/openbmc_project/control/host0/boot".to_string(),
            interface: "xyz.openbmc_project.Control.Boot.Mode".to_string(),
            property: "BootMode".to_string(),
        };
        let mut bus = FakeBus::new();
        assert!(bus.get(&mapping).is_err());

        bus.seed(mapping.clone(), PropertyValue::String("Regular".into()));
        assert_eq!(
            bus.get(&mapping).unwrap(),
            PropertyValue::String("Regular".into())
        );

        bus.set(&mapping, PropertyValue::String("Setup".into())).unwrap();
        assert_eq!(bus.writes.len(), 1);
    }
}
