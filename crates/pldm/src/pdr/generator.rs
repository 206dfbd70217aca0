// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PDR descriptor ingestion.
//!
//! Builds the BMC's PDR repository from a directory of JSON descriptors.
//! Each file may carry an `effecterPDRs` and/or `sensorPDRs` array; every
//! entry names its `pdrType`, which selects the typed generator through the
//! dispatch table below. A malformed file is logged and skipped; the
//! repository is built from whatever parsed.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::types::{
    NumericEffecterPdr, PossibleStates, StateEffecterPdr, StateSensorPdr, TerminusLocatorPdr,
    PDR_TYPE_NUMERIC_EFFECTER, PDR_TYPE_STATE_EFFECTER, PDR_TYPE_STATE_SENSOR, TL_PDR_VALID,
};
use super::PdrRepo;
use crate::bus::{PropertyMapping, PropertyValue};
use crate::config::Tunables;
use crate::error::{Error, Result};

/// Per-state object-bus value pairing for one composite slot.
pub type StateToValueMap = Vec<(u8, PropertyValue)>;

/// Object-bus bindings of one sensor or effecter, indexed by composite
/// offset. A slot without a bus binding holds `None`.
#[derive(Debug, Default)]
pub struct BusObjMaps {
    pub mappings: Vec<Option<PropertyMapping>>,
    pub value_maps: Vec<StateToValueMap>,
}

/// Bus bindings produced while generating the repository.
#[derive(Debug, Default)]
pub struct GeneratedMaps {
    pub sensors: HashMap<u16, BusObjMaps>,
    pub effecters: HashMap<u16, BusObjMaps>,
}

#[derive(Deserialize)]
struct PdrFile {
    #[serde(rename = "effecterPDRs", default)]
    effecter_pdrs: Vec<Value>,
    #[serde(rename = "sensorPDRs", default)]
    sensor_pdrs: Vec<Value>,
}

#[derive(Deserialize)]
struct StateSetEntry {
    state_set_id: u16,
    states: Vec<u8>,
}

#[derive(Deserialize)]
struct BusEntry {
    #[serde(flatten)]
    mapping: PropertyMapping,
    property_type: String,
    /// Object-bus values paired ordinally with the slot's `states` array.
    #[serde(default)]
    property_values: Vec<Value>,
}

#[derive(Deserialize)]
struct StateSlot {
    set: StateSetEntry,
    dbus: Option<BusEntry>,
}

#[derive(Deserialize)]
struct StatePdrEntry {
    id: u16,
    entity_type: u16,
    entity_instance: u16,
    container_id: u16,
    #[serde(default)]
    effecters: Vec<StateSlot>,
    #[serde(default)]
    sensors: Vec<StateSlot>,
}

#[derive(Deserialize)]
struct NumericEffecterEntry {
    id: u16,
    entity_type: u16,
    entity_instance: u16,
    container_id: u16,
    base_unit: u8,
    #[serde(default)]
    unit_modifier: i8,
    #[serde(default = "default_data_size")]
    data_size: u8,
    max_settable: u32,
    min_settable: u32,
    dbus: Option<BusEntry>,
}

fn default_data_size() -> u8 {
    crate::protocol::platform::SensorDataSize::Uint32 as u8
}

/// Pair each state number with the bus value of the same ordinal.
///
/// The descriptor relies on both arrays preserving document order; a length
/// mismatch is a descriptor bug and rejected outright.
fn populate_mapping(bus: &BusEntry, states: &[u8]) -> Result<StateToValueMap> {
    if bus.property_values.len() != states.len() {
        return Err(Error::InvalidData(format!(
            "property_values length {} does not match states length {}",
            bus.property_values.len(),
            states.len()
        )));
    }
    states
        .iter()
        .zip(bus.property_values.iter())
        .map(|(&state, value)| {
            PropertyValue::from_json(&bus.property_type, value).map(|v| (state, v))
        })
        .collect()
}

fn slot_maps(slots: &[StateSlot]) -> Result<BusObjMaps> {
    let mut maps = BusObjMaps::default();
    for slot in slots {
        match &slot.dbus {
            Some(bus) => {
                maps.value_maps.push(populate_mapping(bus, &slot.set.states)?);
                maps.mappings.push(Some(bus.mapping.clone()));
            }
            None => {
                maps.value_maps.push(Vec::new());
                maps.mappings.push(None);
            }
        }
    }
    Ok(maps)
}

fn generate_state_effecter(
    entry: &Value,
    repo: &mut PdrRepo,
    maps: &mut GeneratedMaps,
    terminus_handle: u16,
) -> Result<()> {
    let entry: StatePdrEntry = serde_json::from_value(entry.clone())
        .map_err(|e| Error::InvalidData(format!("state effecter entry: {}", e)))?;
    let obj_maps = slot_maps(&entry.effecters)?;
    let pdr = StateEffecterPdr {
        terminus_handle,
        effecter_id: entry.id,
        entity_type: entry.entity_type,
        entity_instance: entry.entity_instance,
        container_id: entry.container_id,
        effecter_semantic_id: 0,
        effecter_init: 0,
        has_description_pdr: false,
        composite: entry
            .effecters
            .iter()
            .map(|slot| PossibleStates::from_states(slot.set.state_set_id, &slot.set.states))
            .collect(),
    };
    repo.add(pdr.pack())?;
    maps.effecters.insert(entry.id, obj_maps);
    Ok(())
}

fn generate_state_sensor(
    entry: &Value,
    repo: &mut PdrRepo,
    maps: &mut GeneratedMaps,
    terminus_handle: u16,
) -> Result<()> {
    let entry: StatePdrEntry = serde_json::from_value(entry.clone())
        .map_err(|e| Error::InvalidData(format!("state sensor entry: {}", e)))?;
    let obj_maps = slot_maps(&entry.sensors)?;
    let pdr = StateSensorPdr {
        terminus_handle,
        sensor_id: entry.id,
        entity_type: entry.entity_type,
        entity_instance: entry.entity_instance,
        container_id: entry.container_id,
        sensor_init: 0,
        sensor_auxiliary_names: false,
        composite: entry
            .sensors
            .iter()
            .map(|slot| PossibleStates::from_states(slot.set.state_set_id, &slot.set.states))
            .collect(),
    };
    repo.add(pdr.pack())?;
    maps.sensors.insert(entry.id, obj_maps);
    Ok(())
}

fn generate_numeric_effecter(
    entry: &Value,
    repo: &mut PdrRepo,
    maps: &mut GeneratedMaps,
    terminus_handle: u16,
) -> Result<()> {
    let entry: NumericEffecterEntry = serde_json::from_value(entry.clone())
        .map_err(|e| Error::InvalidData(format!("numeric effecter entry: {}", e)))?;
    let pdr = NumericEffecterPdr {
        terminus_handle,
        effecter_id: entry.id,
        entity_type: entry.entity_type,
        entity_instance: entry.entity_instance,
        container_id: entry.container_id,
        effecter_semantic_id: 0,
        effecter_init: 0,
        effecter_auxiliary_names: false,
        base_unit: entry.base_unit,
        unit_modifier: entry.unit_modifier,
        rate_unit: 0,
        base_oem_unit_handle: 0,
        aux_unit: 0,
        aux_unit_modifier: 0,
        aux_rate_unit: 0,
        aux_oem_unit_handle: 0,
        is_linear: true,
        effecter_data_size: entry.data_size,
        resolution: 1.0,
        offset: 0.0,
        accuracy: 0,
        plus_tolerance: 0,
        minus_tolerance: 0,
        state_transition_interval: 0.0,
        transition_interval: 0.0,
        max_settable: entry.max_settable,
        min_settable: entry.min_settable,
        range_field_format: entry.data_size,
        range_field_support: 0,
        nominal_value: 0,
        normal_max: 0,
        normal_min: 0,
        rated_max: 0,
        rated_min: 0,
    };
    repo.add(pdr.pack())?;
    let mut obj_maps = BusObjMaps::default();
    obj_maps.value_maps.push(Vec::new());
    obj_maps.mappings.push(entry.dbus.map(|b| b.mapping));
    maps.effecters.insert(entry.id, obj_maps);
    Ok(())
}

type GeneratorFn = fn(&Value, &mut PdrRepo, &mut GeneratedMaps, u16) -> Result<()>;

/// `pdrType` -> typed generator dispatch table.
const GENERATORS: &[(u8, GeneratorFn)] = &[
    (PDR_TYPE_STATE_SENSOR, generate_state_sensor),
    (PDR_TYPE_NUMERIC_EFFECTER, generate_numeric_effecter),
    (PDR_TYPE_STATE_EFFECTER, generate_state_effecter),
];

fn dispatch_entry(
    entry: &Value,
    repo: &mut PdrRepo,
    maps: &mut GeneratedMaps,
    terminus_handle: u16,
) -> Result<()> {
    let pdr_type = entry
        .get("pdrType")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidData("entry missing pdrType".to_string()))?;
    let generator = GENERATORS
        .iter()
        .find(|(t, _)| u64::from(*t) == pdr_type)
        .map(|(_, g)| g)
        .ok_or_else(|| Error::InvalidData(format!("unsupported pdrType {}", pdr_type)))?;
    generator(entry, repo, maps, terminus_handle)
}

/// Build PDRs from every JSON descriptor under `dir`.
///
/// Files are visited in name order for deterministic handle assignment.
/// A file that fails to parse is logged and skipped.
pub fn generate(dir: &Path, repo: &mut PdrRepo, tunables: &Tunables) -> GeneratedMaps {
    let mut maps = GeneratedMaps::default();
    if !dir.exists() {
        return maps;
    }
    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(e) => {
            log::error!(
                "[generator::generate] cannot read PDR directory, DIR={} ERROR={}",
                dir.display(),
                e
            );
            return maps;
        }
    };
    paths.sort();

    for path in paths {
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::error!(
                    "[generator::generate] cannot read PDR file, PATH={} ERROR={}",
                    path.display(),
                    e
                );
                continue;
            }
        };
        let file: PdrFile = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                log::error!(
                    "[generator::generate] failed parsing PDR JSON file, PATH={} ERROR={}",
                    path.display(),
                    e
                );
                continue;
            }
        };
        for entry in file.effecter_pdrs.iter().chain(file.sensor_pdrs.iter()) {
            if let Err(e) = dispatch_entry(entry, repo, &mut maps, tunables.terminus_handle) {
                log::error!(
                    "[generator::generate] skipping PDR entry, PATH={} ERROR={}",
                    path.display(),
                    e
                );
            }
        }
    }
    maps
}

/// Build and store the BMC's own terminus locator PDR.
///
/// Always recorded with version 1, MCTP EID locator, and the configured
/// terminus identity; returns the typed record and its handle.
pub fn build_terminus_locator_pdr(
    repo: &mut PdrRepo,
    tunables: &Tunables,
) -> Result<(u32, TerminusLocatorPdr)> {
    let pdr = TerminusLocatorPdr {
        terminus_handle: tunables.terminus_handle,
        validity: TL_PDR_VALID,
        tid: tunables.terminus_id,
        container_id: 0,
        eid: tunables.bmc_mctp_eid,
    };
    let handle = repo.add(pdr.pack())?;
    Ok((handle, pdr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdr::types::Pdr;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    const STATE_EFFECTER_JSON: &str = r#"{
        "effecterPDRs": [
            {
                "pdrType": 11,
                "id": 257,
                "entity_type": 33,
                "entity_instance": 0,
                "container_id": 0,
                "effecters": [
                    {
                        "set": { "state_set_id": 196, "states": [1, 2] },
                        "dbus": {
                            "object_path": "/xyz/openbmc_project/control/host0/boot",
                            "interface": "xyz.openbmc_project.Control.Boot.Mode",
                            "property_name": "BootMode",
                            "property_type": "string",
                            "property_values": ["Regular", "Setup"]
                        }
                    }
                ]
            }
        ]
    }"#;

    const STATE_SENSOR_JSON: &str = r#"{
        "sensorPDRs": [
            {
                "pdrType": 4,
                "id": 160,
                "entity_type": 64,
                "entity_instance": 1,
                "container_id": 0,
                "sensors": [
                    { "set": { "state_set_id": 260, "states": [0, 9] } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_generate_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "effecters.json", STATE_EFFECTER_JSON);
        write_file(dir.path(), "sensors.json", STATE_SENSOR_JSON);

        let mut repo = PdrRepo::new();
        let maps = generate(dir.path(), &mut repo, &Tunables::new());

        assert_eq!(repo.len(), 2);
        assert!(maps.effecters.contains_key(&257));
        assert!(maps.sensors.contains_key(&160));

        let effecter_maps = &maps.effecters[&257];
        assert_eq!(effecter_maps.value_maps.len(), 1);
        assert_eq!(
            effecter_maps.value_maps[0],
            vec![
                (1, PropertyValue::String("Regular".into())),
                (2, PropertyValue::String("Setup".into())),
            ]
        );

        // sensor slot had no bus binding
        let sensor_maps = &maps.sensors[&160];
        assert_eq!(sensor_maps.mappings, vec![None]);
    }

    #[test]
    fn test_malformed_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.json", "{ not json");
        write_file(dir.path(), "good.json", STATE_SENSOR_JSON);

        let mut repo = PdrRepo::new();
        let maps = generate(dir.path(), &mut repo, &Tunables::new());
        assert_eq!(repo.len(), 1);
        assert!(maps.sensors.contains_key(&160));
    }

    #[test]
    fn test_missing_directory_yields_empty_repo() {
        let mut repo = PdrRepo::new();
        let maps = generate(Path::new("/nonexistent/pdr"), &mut repo, &Tunables::new());
        assert!(repo.is_empty());
        assert!(maps.sensors.is_empty());
    }

    #[test]
    fn test_mapping_length_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        // two states but three property values
        write_file(
            dir.path(),
            "mismatch.json",
            r#"{
                "effecterPDRs": [{
                    "pdrType": 11,
                    "id": 300,
                    "entity_type": 33,
                    "entity_instance": 0,
                    "container_id": 0,
                    "effecters": [{
                        "set": { "state_set_id": 196, "states": [1, 2] },
                        "dbus": {
                            "object_path": "/a", "interface": "b",
                            "property_name": "c", "property_type": "string",
                            "property_values": ["x", "y", "z"]
                        }
                    }]
                }]
            }"#,
        );
        let mut repo = PdrRepo::new();
        let maps = generate(dir.path(), &mut repo, &Tunables::new());
        assert!(maps.effecters.is_empty());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_terminus_locator_identity() {
        let mut repo = PdrRepo::new();
        let tunables = Tunables::new();
        let (handle, pdr) = build_terminus_locator_pdr(&mut repo, &tunables).unwrap();
        assert_eq!(handle, 1);
        assert_eq!(pdr.tid, tunables.terminus_id);
        assert_eq!(pdr.eid, tunables.bmc_mctp_eid);
        assert_eq!(pdr.validity, TL_PDR_VALID);

        let entry = repo.get_by_handle(handle).unwrap();
        let (header, parsed) = Pdr::parse(entry.data).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(parsed, Pdr::TerminusLocator(pdr));
    }
}
