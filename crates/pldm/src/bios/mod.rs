// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BIOS attribute registry.
//!
//! Ingests the three BIOS descriptor files (`enum_attrs.json`,
//! `string_attrs.json`, `integer_attrs.json`), validates each attribute's
//! shape, and resolves current values either from the attribute's object-bus
//! property or from its static default.
//!
//! Setup is idempotent: once populated, repeated calls are no-ops. A
//! process-wide registry is available through [`global`]; standalone
//! instances serve tests and embedders that scope the registry themselves.

/// String/integer shape validation.
pub mod table;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde::Deserialize;
use serde_json::Value;

use crate::bus::{BusProperties, PropertyMapping, PropertyValue};
use crate::error::{Error, Result};
use table::{check_integer_info, check_string_info, string_type_from_name, IntegerInfo, StringInfo};

/// The three descriptor files, scanned in this order.
pub const BIOS_CONFIG_FILES: &[&str] = &["enum_attrs.json", "string_attrs.json", "integer_attrs.json"];

/// Enumeration attribute: selectable strings with bus-value mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumAttribute {
    pub read_only: bool,
    pub possible_values: Vec<String>,
    pub default_values: Vec<String>,
    /// Object-bus property value -> attribute string, ordinal-paired.
    pub value_map: Vec<(PropertyValue, String)>,
    pub mapping: Option<PropertyMapping>,
}

/// Free-form string attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAttribute {
    pub read_only: bool,
    pub info: StringInfo,
    pub mapping: Option<PropertyMapping>,
}

/// Bounded integer attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerAttribute {
    pub read_only: bool,
    pub info: IntegerInfo,
    pub mapping: Option<PropertyMapping>,
}

/// One registered attribute of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BiosAttribute {
    Enumeration(EnumAttribute),
    String(StringAttribute),
    Integer(IntegerAttribute),
}

/// Resolved current value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Enumeration: selected attribute strings.
    Strings(Vec<String>),
    /// String attribute text.
    Text(String),
    /// Integer attribute value.
    Number(u64),
}

#[derive(Deserialize)]
struct BiosFile {
    #[serde(default)]
    entries: Vec<Value>,
}

#[derive(Deserialize)]
struct BusSection {
    #[serde(flatten)]
    mapping: PropertyMapping,
    #[serde(default)]
    property_type: String,
    #[serde(default)]
    property_values: Vec<Value>,
}

#[derive(Deserialize)]
struct EnumEntry {
    attribute_name: String,
    possible_values: Vec<String>,
    default_values: Vec<String>,
    dbus: Option<BusSection>,
}

#[derive(Deserialize)]
struct StringEntry {
    attribute_name: String,
    #[serde(default = "default_string_type")]
    string_type: String,
    #[serde(default)]
    minimum_string_length: u16,
    #[serde(default)]
    maximum_string_length: u16,
    #[serde(default)]
    default_string_length: u16,
    #[serde(default)]
    default_string: String,
    dbus: Option<BusSection>,
}

fn default_string_type() -> String {
    "Unknown".to_string()
}

#[derive(Deserialize)]
struct IntegerEntry {
    attribute_name: String,
    #[serde(default)]
    lower_bound: u64,
    #[serde(default)]
    upper_bound: u64,
    #[serde(default = "default_scalar_increment")]
    scalar_increment: u32,
    #[serde(default)]
    default_value: u64,
    dbus: Option<BusSection>,
}

fn default_scalar_increment() -> u32 {
    1
}

/// The BIOS attribute registry.
#[derive(Debug, Default)]
pub struct BiosRegistry {
    /// Attribute names and enum possible-values, in ingestion order. These
    /// seed the BIOS string table.
    strings: Vec<String>,
    attributes: HashMap<String, BiosAttribute>,
}

impl BiosRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether setup already ran to completion.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.strings.is_empty() && !self.attributes.is_empty()
    }

    /// Ingest the BIOS descriptor directory.
    ///
    /// Idempotent: a populated registry returns immediately. A malformed
    /// file is logged and skipped; only a registry left entirely empty is
    /// reported as an error.
    pub fn setup_config(&mut self, dir: &Path) -> Result<()> {
        if self.is_populated() {
            return Ok(());
        }
        if !dir.exists() {
            log::error!(
                "[BiosRegistry::setup_config] BIOS config directory does not exist, DIR={}",
                dir.display()
            );
            return Err(Error::InvalidData(
                "BIOS config directory does not exist".to_string(),
            ));
        }

        for file_name in BIOS_CONFIG_FILES {
            let path = dir.join(file_name);
            let file: BiosFile = match std::fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|text| {
                    serde_json::from_str(&text)
                        .map_err(|e| Error::InvalidData(e.to_string()))
                }) {
                Ok(file) => file,
                Err(e) => {
                    log::error!(
                        "[BiosRegistry::setup_config] skipping BIOS config file, FILE={} ERROR={}",
                        path.display(),
                        e
                    );
                    continue;
                }
            };
            for entry in &file.entries {
                if let Err(e) = self.setup_entry(file_name, entry) {
                    log::error!(
                        "[BiosRegistry::setup_config] skipping attribute entry, FILE={} ERROR={}",
                        file_name,
                        e
                    );
                }
            }
        }

        if self.strings.is_empty() {
            log::error!(
                "[BiosRegistry::setup_config] no attribute found in the config directory, DIR={}",
                dir.display()
            );
            return Err(Error::InvalidData(
                "no BIOS attribute was ingested".to_string(),
            ));
        }
        Ok(())
    }

    fn setup_entry(&mut self, file_name: &str, entry: &Value) -> Result<()> {
        match file_name {
            "enum_attrs.json" => self.setup_enum(entry),
            "string_attrs.json" => self.setup_string(entry),
            "integer_attrs.json" => self.setup_integer(entry),
            other => Err(Error::InternalFailure(format!(
                "no handler for BIOS file {}",
                other
            ))),
        }
    }

    fn setup_enum(&mut self, entry: &Value) -> Result<()> {
        let entry: EnumEntry = serde_json::from_value(entry.clone())
            .map_err(|e| Error::InvalidData(format!("enum attribute entry: {}", e)))?;

        let (value_map, mapping) = match &entry.dbus {
            Some(bus) => (
                populate_mapping(bus, &entry.possible_values)?,
                Some(bus.mapping.clone()),
            ),
            None => (Vec::new(), None),
        };

        self.strings.push(entry.attribute_name.clone());
        self.strings.extend(entry.possible_values.iter().cloned());
        self.attributes.insert(
            entry.attribute_name,
            BiosAttribute::Enumeration(EnumAttribute {
                read_only: entry.dbus.is_none(),
                possible_values: entry.possible_values,
                default_values: entry.default_values,
                value_map,
                mapping,
            }),
        );
        Ok(())
    }

    fn setup_string(&mut self, entry: &Value) -> Result<()> {
        let entry: StringEntry = serde_json::from_value(entry.clone())
            .map_err(|e| Error::InvalidData(format!("string attribute entry: {}", e)))?;

        let info = StringInfo {
            string_type: string_type_from_name(&entry.string_type)?,
            min_length: entry.minimum_string_length,
            max_length: entry.maximum_string_length,
            default_length: entry.default_string_length,
            default_string: entry.default_string,
        };
        check_string_info(&info)?;

        self.strings.push(entry.attribute_name.clone());
        self.attributes.insert(
            entry.attribute_name,
            BiosAttribute::String(StringAttribute {
                read_only: entry.dbus.is_none(),
                info,
                mapping: entry.dbus.map(|b| b.mapping),
            }),
        );
        Ok(())
    }

    fn setup_integer(&mut self, entry: &Value) -> Result<()> {
        let entry: IntegerEntry = serde_json::from_value(entry.clone())
            .map_err(|e| Error::InvalidData(format!("integer attribute entry: {}", e)))?;

        let info = IntegerInfo {
            lower_bound: entry.lower_bound,
            upper_bound: entry.upper_bound,
            scalar_increment: entry.scalar_increment,
            default_value: entry.default_value,
        };
        check_integer_info(&info)?;

        self.strings.push(entry.attribute_name.clone());
        self.attributes.insert(
            entry.attribute_name,
            BiosAttribute::Integer(IntegerAttribute {
                read_only: entry.dbus.is_none(),
                info,
                mapping: entry.dbus.map(|b| b.mapping),
            }),
        );
        Ok(())
    }

    /// Strings collected for the BIOS string table, in ingestion order.
    #[must_use]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Look up a registered attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BiosAttribute> {
        self.attributes.get(name)
    }

    /// Number of registered attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Resolve the current value of `name`.
    ///
    /// Bus-backed attributes read their property; an unmapped bus value (or
    /// no bus binding at all) falls back to the default.
    pub fn attr_value(&self, name: &str, bus: &dyn BusProperties) -> Result<AttributeValue> {
        let attribute = self
            .attributes
            .get(name)
            .ok_or_else(|| Error::InvalidData(format!("unknown BIOS attribute {:?}", name)))?;

        match attribute {
            BiosAttribute::Enumeration(attr) => {
                let Some(mapping) = attr.mapping.as_ref() else {
                    return Ok(AttributeValue::Strings(attr.default_values.clone()));
                };
                let current = bus.get(mapping)?;
                let selected = attr
                    .value_map
                    .iter()
                    .find(|(value, _)| *value == current)
                    .map(|(_, s)| vec![s.clone()])
                    .unwrap_or_else(|| attr.default_values.clone());
                Ok(AttributeValue::Strings(selected))
            }
            BiosAttribute::String(attr) => {
                let Some(mapping) = attr.mapping.as_ref() else {
                    return Ok(AttributeValue::Text(attr.info.default_string.clone()));
                };
                match bus.get(mapping)? {
                    PropertyValue::String(s) => Ok(AttributeValue::Text(s)),
                    other => Err(Error::InvalidData(format!(
                        "string attribute {:?} backed by non-string property {:?}",
                        name, other
                    ))),
                }
            }
            BiosAttribute::Integer(attr) => {
                let Some(mapping) = attr.mapping.as_ref() else {
                    return Ok(AttributeValue::Number(attr.info.default_value));
                };
                let value = match bus.get(mapping)? {
                    PropertyValue::U8(v) => u64::from(v),
                    PropertyValue::U16(v) => u64::from(v),
                    PropertyValue::U32(v) => u64::from(v),
                    PropertyValue::U64(v) => v,
                    other => {
                        return Err(Error::InvalidData(format!(
                            "integer attribute {:?} backed by non-integer property {:?}",
                            name, other
                        )))
                    }
                };
                Ok(AttributeValue::Number(value))
            }
        }
    }
}

/// Pair each possible-value string with the bus value of the same ordinal.
fn populate_mapping(
    bus: &BusSection,
    possible_values: &[String],
) -> Result<Vec<(PropertyValue, String)>> {
    if bus.property_values.len() != possible_values.len() {
        return Err(Error::InvalidData(format!(
            "property_values length {} does not match possible_values length {}",
            bus.property_values.len(),
            possible_values.len()
        )));
    }
    bus.property_values
        .iter()
        .zip(possible_values.iter())
        .map(|(value, name)| {
            PropertyValue::from_json(&bus.property_type, value).map(|v| (v, name.clone()))
        })
        .collect()
}

static REGISTRY: OnceLock<Mutex<BiosRegistry>> = OnceLock::new();

/// Process-wide registry, created empty on first use. Initialize it once at
/// startup with [`BiosRegistry::setup_config`].
pub fn global() -> &'static Mutex<BiosRegistry> {
    REGISTRY.get_or_init(|| Mutex::new(BiosRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FakeBus;
    use std::io::Write;

    const ENUM_JSON: &str = r#"{
        "entries": [
            {
                "attribute_name": "FWBootSide",
                "possible_values": ["Perm", "Temp"],
                "default_values": ["Temp"],
                "dbus": {
                    "object_path": "/xyz/openbmc_project/software",
                    "interface": "xyz.openbmc_project.Software.RedundancyPriority",
                    "property_name": "Priority",
                    "property_type": "uint8_t",
                    "property_values": [0, 1]
                }
            },
            {
                "attribute_name": "CodeUpdatePolicy",
                "possible_values": ["Concurrent", "Disruptive"],
                "default_values": ["Concurrent"]
            }
        ]
    }"#;

    const STRING_JSON: &str = r#"{
        "entries": [
            {
                "attribute_name": "str_example",
                "string_type": "ASCII",
                "minimum_string_length": 1,
                "maximum_string_length": 100,
                "default_string_length": 3,
                "default_string": "abc"
            }
        ]
    }"#;

    const INTEGER_JSON: &str = r#"{
        "entries": [
            {
                "attribute_name": "SBESlubEnable",
                "lower_bound": 0,
                "upper_bound": 100,
                "scalar_increment": 5,
                "default_value": 10
            }
        ]
    }"#;

    fn write_config(dir: &Path, enum_json: &str, string_json: &str, integer_json: &str) {
        for (name, content) in [
            ("enum_attrs.json", enum_json),
            ("string_attrs.json", string_json),
            ("integer_attrs.json", integer_json),
        ] {
            let mut f = std::fs::File::create(dir.join(name)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }
    }

    fn populated_registry(dir: &Path) -> BiosRegistry {
        write_config(dir, ENUM_JSON, STRING_JSON, INTEGER_JSON);
        let mut registry = BiosRegistry::new();
        registry.setup_config(dir).unwrap();
        registry
    }

    #[test]
    fn test_setup_ingests_all_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let registry = populated_registry(dir.path());
        assert_eq!(registry.len(), 4);
        assert!(matches!(
            registry.get("FWBootSide"),
            Some(BiosAttribute::Enumeration(_))
        ));
        assert!(matches!(
            registry.get("str_example"),
            Some(BiosAttribute::String(_))
        ));
        assert!(matches!(
            registry.get("SBESlubEnable"),
            Some(BiosAttribute::Integer(_))
        ));
        // string table: attribute names plus enum possible values
        assert!(registry.strings().contains(&"Perm".to_string()));
        assert!(registry.strings().contains(&"SBESlubEnable".to_string()));
    }

    #[test]
    fn test_setup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = populated_registry(dir.path());
        let strings_before = registry.strings().to_vec();
        let len_before = registry.len();

        registry.setup_config(dir.path()).unwrap();
        assert_eq!(registry.strings(), strings_before.as_slice());
        assert_eq!(registry.len(), len_before);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let mut registry = BiosRegistry::new();
        assert!(registry.setup_config(Path::new("/nonexistent/bios")).is_err());
    }

    #[test]
    fn test_malformed_file_skipped_others_kept() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "{ not json", STRING_JSON, INTEGER_JSON);
        let mut registry = BiosRegistry::new();
        registry.setup_config(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("FWBootSide").is_none());
    }

    #[test]
    fn test_fully_empty_registry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "{ bad", "{ bad", "{ bad");
        let mut registry = BiosRegistry::new();
        assert!(registry.setup_config(dir.path()).is_err());
    }

    #[test]
    fn test_invalid_integer_entry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        // scalar increment 7 does not divide the 0..=100 span
        let bad_integer = r#"{
            "entries": [{
                "attribute_name": "Broken",
                "lower_bound": 0,
                "upper_bound": 100,
                "scalar_increment": 7,
                "default_value": 0
            }]
        }"#;
        write_config(dir.path(), ENUM_JSON, STRING_JSON, bad_integer);
        let mut registry = BiosRegistry::new();
        registry.setup_config(dir.path()).unwrap();
        assert!(registry.get("Broken").is_none());
    }

    #[test]
    fn test_enum_value_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let registry = populated_registry(dir.path());

        let mut bus = FakeBus::new();
        bus.seed(
            PropertyMapping {
                object_path: "/xyz/openbmc_project/software".into(),
                interface: "xyz.openbmc_project.Software.RedundancyPriority".into(),
                property: "Priority".into(),
            },
            PropertyValue::U8(0),
        );
        assert_eq!(
            registry.attr_value("FWBootSide", &bus).unwrap(),
            AttributeValue::Strings(vec!["Perm".to_string()])
        );

        // unmapped property value falls back to the defaults
        bus.properties.clear();
        bus.seed(
            PropertyMapping {
                object_path: "/xyz/openbmc_project/software".into(),
                interface: "xyz.openbmc_project.Software.RedundancyPriority".into(),
                property: "Priority".into(),
            },
            PropertyValue::U8(9),
        );
        assert_eq!(
            registry.attr_value("FWBootSide", &bus).unwrap(),
            AttributeValue::Strings(vec!["Temp".to_string()])
        );

        // attribute without a bus binding resolves to its default
        assert_eq!(
            registry.attr_value("CodeUpdatePolicy", &bus).unwrap(),
            AttributeValue::Strings(vec!["Concurrent".to_string()])
        );
    }

    #[test]
    fn test_string_and_integer_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let registry = populated_registry(dir.path());
        let bus = FakeBus::new();

        assert_eq!(
            registry.attr_value("str_example", &bus).unwrap(),
            AttributeValue::Text("abc".to_string())
        );
        assert_eq!(
            registry.attr_value("SBESlubEnable", &bus).unwrap(),
            AttributeValue::Number(10)
        );
        assert!(registry.attr_value("NoSuchAttr", &bus).is_err());
    }

    #[test]
    fn test_global_registry_accessor() {
        let registry = global().lock().unwrap();
        // fresh process-wide registry starts empty
        let _ = registry.is_populated();
    }
}
