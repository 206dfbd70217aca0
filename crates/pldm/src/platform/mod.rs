// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform monitoring & control responder.
//!
//! [`Handler`] owns the PDR repository, the host PDR tracker, and the event
//! dispatch tree, and services the platform command set. Every error path
//! answers with a completion-code-only response carrying the request's
//! instance id; event handler chains run in registration order and the
//! first failure aborts the chain.

/// Event-class handler chains.
pub mod events;
/// Host PDR lookup state and fetch planning.
pub mod host;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::bus::{BusProperties, PropertyValue, SignalSink};
use crate::config::Tunables;
use crate::error::{Error, Result};
use crate::pdr::generator::{self, GeneratedMaps};
use crate::pdr::types::{
    Pdr, OEM_ENTITY_TYPE_END, OEM_ENTITY_TYPE_START, OEM_STATE_SET_ID_END, OEM_STATE_SET_ID_START,
    PDR_TYPE_NUMERIC_EFFECTER, PDR_TYPE_STATE_EFFECTER, PDR_TYPE_STATE_SENSOR,
};
use crate::pdr::PdrRepo;
use crate::protocol::platform::{
    decode_get_pdr_req, decode_get_state_sensor_readings_req, decode_platform_event_message_req,
    decode_set_numeric_effecter_value_req, decode_set_state_effecter_states_req,
    encode_get_pdr_resp, encode_get_state_sensor_readings_resp, encode_platform_event_message_resp,
    SensorDataSize, SensorStateField, StateEffecterField, CMD_GET_PDR,
    CMD_GET_STATE_SENSOR_READINGS, CMD_PLATFORM_EVENT_MESSAGE, CMD_SET_NUMERIC_EFFECTER_VALUE,
    CMD_SET_STATE_EFFECTER_STATES, EVENT_CLASS_HEARTBEAT_TIMER_ELAPSED,
    EVENT_CLASS_MESSAGE_POLL, EVENT_CLASS_PDR_REPOSITORY_CHG, EVENT_CLASS_SENSOR,
    EVENT_NO_LOGGING,
};
use crate::protocol::{build_response, ccode, split_message, MessageHeader, PLDM_TYPE_PLATFORM};
use events::EventHandlerFn;
use host::HostPdrTracker;

/// Sensor operational state: enabled, reading valid.
const SENSOR_OP_ENABLED: u8 = 0;
/// Sensor operational state: no reading available.
const SENSOR_OP_UNAVAILABLE: u8 = 2;

/// OEM platform hooks (watchdog, OEM PDRs, OEM sensor/effecter ranges).
///
/// Script-invocation specifics live outside the core; the responder only
/// routes through this trait when an id probes into the OEM ranges.
pub trait OemPlatformHandler {
    /// BMC state gate consulted before serving GetPDR.
    fn check_bmc_state(&self) -> Result<()> {
        Ok(())
    }

    /// Kick the platform watchdog (heartbeatTimerElapsed event).
    fn reset_watchdog(&mut self);

    /// Contribute OEM PDRs during repository build.
    fn build_oem_pdrs(&mut self, _repo: &mut PdrRepo) -> Result<()> {
        Ok(())
    }

    /// Apply a state effecter request in an OEM range.
    fn set_oem_state_effecter(
        &mut self,
        entity_type: u16,
        entity_instance: u16,
        state_set_id: u16,
        fields: &[StateEffecterField],
    ) -> Result<()>;

    /// Read composite sensor states in an OEM range.
    fn get_oem_state_sensor_readings(
        &mut self,
        entity_type: u16,
        entity_instance: u16,
        state_set_id: u16,
        composite_count: u8,
    ) -> Result<Vec<SensorStateField>>;
}

/// Outcome of probing an id against the OEM entity/state-set ranges.
struct OemProbe {
    entity_type: u16,
    entity_instance: u16,
    state_set_id: u16,
    composite_count: u8,
}

/// Platform command responder.
pub struct Handler {
    pub(crate) repo: PdrRepo,
    pub(crate) host: HostPdrTracker,
    pub(crate) signals: Box<dyn SignalSink>,
    bus: Box<dyn BusProperties>,
    maps: GeneratedMaps,
    oem: Option<Box<dyn OemPlatformHandler>>,
    event_handlers: HashMap<u8, Vec<EventHandlerFn>>,
    tunables: Tunables,
    pdr_jsons_dir: PathBuf,
    pdr_created: bool,
}

impl Handler {
    /// Create a responder with the built-in event chains registered.
    ///
    /// The repository stays empty until the first GetPDR builds it (terminus
    /// locator PDR, JSON descriptors, OEM PDRs).
    pub fn new(
        pdr_jsons_dir: impl Into<PathBuf>,
        tunables: Tunables,
        signals: Box<dyn SignalSink>,
        bus: Box<dyn BusProperties>,
    ) -> Self {
        let mut handler = Self {
            repo: PdrRepo::new(),
            host: HostPdrTracker::new(),
            signals,
            bus,
            maps: GeneratedMaps::default(),
            oem: None,
            event_handlers: HashMap::new(),
            tunables,
            pdr_jsons_dir: pdr_jsons_dir.into(),
            pdr_created: false,
        };
        handler.register_event_handler(EVENT_CLASS_SENSOR, events::sensor_event);
        handler.register_event_handler(EVENT_CLASS_MESSAGE_POLL, events::message_poll_event);
        handler.register_event_handler(
            EVENT_CLASS_PDR_REPOSITORY_CHG,
            events::pdr_repository_chg_event,
        );
        handler
    }

    /// Attach OEM platform hooks.
    pub fn set_oem_handler(&mut self, oem: Box<dyn OemPlatformHandler>) {
        self.oem = Some(oem);
    }

    /// Append a handler to `event_class`'s chain (invocation order is
    /// registration order).
    pub fn register_event_handler(&mut self, event_class: u8, handler: EventHandlerFn) {
        self.event_handlers
            .entry(event_class)
            .or_default()
            .push(handler);
    }

    #[must_use]
    pub fn repo(&self) -> &PdrRepo {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut PdrRepo {
        &mut self.repo
    }

    #[must_use]
    pub fn host(&self) -> &HostPdrTracker {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostPdrTracker {
        &mut self.host
    }

    /// Completion-code-only response echoing the request's header.
    #[must_use]
    pub fn cc_only_response(request_hdr: &MessageHeader, completion_code: u8) -> Vec<u8> {
        build_response(
            request_hdr.instance_id,
            request_hdr.pldm_type,
            request_hdr.command,
            &[completion_code],
        )
    }

    /// Service one inbound request message and produce the response.
    ///
    /// Fails only when the message has no decodable header to respond to.
    pub fn handle_request(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        let (hdr, payload) = split_message(msg)?;
        if !hdr.request {
            return Err(Error::InvalidData(
                "responder received a response message".to_string(),
            ));
        }
        if hdr.pldm_type != PLDM_TYPE_PLATFORM {
            return Ok(Self::cc_only_response(&hdr, ccode::ERROR_INVALID_PLDM_TYPE));
        }
        let response = match hdr.command {
            CMD_GET_PDR => self.get_pdr(&hdr, payload),
            CMD_PLATFORM_EVENT_MESSAGE => self.platform_event_message(&hdr, payload),
            CMD_SET_STATE_EFFECTER_STATES => self.set_state_effecter_states(&hdr, payload),
            CMD_SET_NUMERIC_EFFECTER_VALUE => self.set_numeric_effecter_value(&hdr, payload),
            CMD_GET_STATE_SENSOR_READINGS => self.get_state_sensor_readings(&hdr, payload),
            _ => Self::cc_only_response(&hdr, ccode::ERROR_UNSUPPORTED_PLDM_CMD),
        };
        Ok(response)
    }

    /// Build the repository once: terminus locator PDR, JSON descriptors,
    /// OEM contributions.
    fn ensure_repo_built(&mut self) -> Result<()> {
        if self.pdr_created {
            return Ok(());
        }
        let (_, tl) = generator::build_terminus_locator_pdr(&mut self.repo, &self.tunables)?;
        self.host
            .record_tl_info(tl.terminus_handle, tl.tid, tl.eid, tl.validity);
        self.maps = generator::generate(&self.pdr_jsons_dir, &mut self.repo, &self.tunables);
        if let Some(oem) = self.oem.as_mut() {
            oem.build_oem_pdrs(&mut self.repo)?;
        }
        self.pdr_created = true;
        Ok(())
    }

    // ========================================================================
    // GetPDR
    // ========================================================================

    fn get_pdr(&mut self, hdr: &MessageHeader, payload: &[u8]) -> Vec<u8> {
        if let Some(oem) = self.oem.as_ref() {
            if oem.check_bmc_state().is_err() {
                return Self::cc_only_response(hdr, ccode::ERROR_NOT_READY);
            }
        }
        if let Err(e) = self.ensure_repo_built() {
            log::error!("[Handler::get_pdr] repository build failed, ERROR={}", e);
            return Self::cc_only_response(hdr, ccode::ERROR);
        }

        let req = match decode_get_pdr_req(payload) {
            Ok(req) => req,
            Err(e) => return Self::cc_only_response(hdr, e.completion_code()),
        };

        let Some(entry) = self.repo.get_by_handle(req.record_handle) else {
            return Self::cc_only_response(hdr, ccode::PLATFORM_INVALID_RECORD_HANDLE);
        };

        let count = (req.request_count as usize).min(entry.size());
        encode_get_pdr_resp(
            hdr.instance_id,
            ccode::SUCCESS,
            entry.next_record_handle,
            &entry.data[..count],
        )
    }

    // ========================================================================
    // platformEventMessage
    // ========================================================================

    fn platform_event_message(&mut self, hdr: &MessageHeader, payload: &[u8]) -> Vec<u8> {
        let (_format_version, tid, event_class, event_data) =
            match decode_platform_event_message_req(payload) {
                Ok(parts) => parts,
                Err(e) => return Self::cc_only_response(hdr, e.completion_code()),
            };

        if event_class == EVENT_CLASS_HEARTBEAT_TIMER_ELAPSED {
            if let Some(oem) = self.oem.as_mut() {
                oem.reset_watchdog();
            }
        } else {
            let Some(chain) = self.event_handlers.get(&event_class).cloned() else {
                return Self::cc_only_response(hdr, ccode::ERROR_INVALID_DATA);
            };
            for handler in chain {
                if let Err(e) = handler(self, tid, event_data) {
                    log::warn!(
                        "[Handler::platform_event_message] handler failed, CLASS={:#04x} TID={} ERROR={}",
                        event_class,
                        tid,
                        e
                    );
                    return Self::cc_only_response(hdr, e.completion_code());
                }
            }
        }
        encode_platform_event_message_resp(hdr.instance_id, ccode::SUCCESS, EVENT_NO_LOGGING)
    }

    // ========================================================================
    // setStateEffecterStates
    // ========================================================================

    fn set_state_effecter_states(&mut self, hdr: &MessageHeader, payload: &[u8]) -> Vec<u8> {
        let (effecter_id, fields) = match decode_set_state_effecter_states_req(payload) {
            Ok(parts) => parts,
            Err(e) => return Self::cc_only_response(hdr, e.completion_code()),
        };

        let oem_probe = self.probe_oem_state_effecter(effecter_id, fields.len() as u8);
        let result = match oem_probe {
            Some(probe) if self.oem.is_some() && !self.maps.effecters.contains_key(&effecter_id) => {
                self.oem
                    .as_mut()
                    .map(|oem| {
                        oem.set_oem_state_effecter(
                            probe.entity_type,
                            probe.entity_instance,
                            probe.state_set_id,
                            &fields,
                        )
                    })
                    .unwrap_or(Ok(()))
            }
            _ => self.set_bus_state_effecter(effecter_id, &fields),
        };

        match result {
            Ok(()) => Self::cc_only_response(hdr, ccode::SUCCESS),
            Err(e) => Self::cc_only_response(hdr, e.completion_code()),
        }
    }

    fn set_bus_state_effecter(
        &mut self,
        effecter_id: u16,
        fields: &[StateEffecterField],
    ) -> Result<()> {
        let maps = self
            .maps
            .effecters
            .get(&effecter_id)
            .ok_or_else(|| Error::InvalidData(format!("unknown effecter id {}", effecter_id)))?;
        if fields.len() > maps.mappings.len() {
            return Err(Error::InvalidData(format!(
                "composite count {} exceeds effecter's {}",
                fields.len(),
                maps.mappings.len()
            )));
        }
        for (offset, field) in fields.iter().enumerate() {
            if field.set_request == 0 {
                continue;
            }
            let Some(mapping) = maps.mappings[offset].as_ref() else {
                continue;
            };
            let value = maps.value_maps[offset]
                .iter()
                .find(|(state, _)| *state == field.effecter_state)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "effecter state {} has no mapped value at offset {}",
                        field.effecter_state, offset
                    ))
                })?;
            self.bus.set(mapping, value)?;
        }
        Ok(())
    }

    // ========================================================================
    // setNumericEffecterValue
    // ========================================================================

    fn set_numeric_effecter_value(&mut self, hdr: &MessageHeader, payload: &[u8]) -> Vec<u8> {
        let (effecter_id, data_size, value) = match decode_set_numeric_effecter_value_req(payload) {
            Ok(parts) => parts,
            Err(e) => return Self::cc_only_response(hdr, e.completion_code()),
        };
        match self.apply_numeric_effecter(effecter_id, data_size, value) {
            Ok(()) => Self::cc_only_response(hdr, ccode::SUCCESS),
            Err(e) => Self::cc_only_response(hdr, e.completion_code()),
        }
    }

    fn apply_numeric_effecter(
        &mut self,
        effecter_id: u16,
        data_size: SensorDataSize,
        value: u32,
    ) -> Result<()> {
        let mut numeric = PdrRepo::new();
        self.repo.filter_by_type(PDR_TYPE_NUMERIC_EFFECTER, &mut numeric)?;
        let mut cursor = numeric.get_first();
        let pdr = loop {
            let Some(entry) = cursor else {
                return Err(Error::InvalidData(format!(
                    "unknown numeric effecter id {}",
                    effecter_id
                )));
            };
            if let (_, Pdr::NumericEffecter(pdr)) = Pdr::parse(entry.data)? {
                if pdr.effecter_id == effecter_id {
                    break pdr;
                }
            }
            cursor = numeric.get_next(entry.record_handle);
        };

        if value < pdr.min_settable || value > pdr.max_settable {
            return Err(Error::InvalidData(format!(
                "value {} outside settable range {}..={}",
                value, pdr.min_settable, pdr.max_settable
            )));
        }

        let maps = self
            .maps
            .effecters
            .get(&effecter_id)
            .ok_or_else(|| Error::InvalidData(format!("unmapped effecter id {}", effecter_id)))?;
        let Some(Some(mapping)) = maps.mappings.first() else {
            return Ok(());
        };
        let property = match data_size {
            SensorDataSize::Uint8 | SensorDataSize::Sint8 => PropertyValue::U8(value as u8),
            SensorDataSize::Uint16 | SensorDataSize::Sint16 => PropertyValue::U16(value as u16),
            SensorDataSize::Uint32 | SensorDataSize::Sint32 => PropertyValue::U32(value),
        };
        self.bus.set(mapping, property)
    }

    // ========================================================================
    // getStateSensorReadings
    // ========================================================================

    fn get_state_sensor_readings(&mut self, hdr: &MessageHeader, payload: &[u8]) -> Vec<u8> {
        let (sensor_id, sensor_rearm) = match decode_get_state_sensor_readings_req(payload) {
            Ok(parts) => parts,
            Err(e) => return Self::cc_only_response(hdr, e.completion_code()),
        };
        // A zero rearm bitfield is a plain read: no composite sensor is
        // rearmed, the full reading is still returned.
        let rearm_count = sensor_rearm.count_ones() as u8;

        let oem_probe = self.probe_oem_state_sensor(sensor_id, rearm_count);
        let result = match oem_probe {
            Some(probe) if self.oem.is_some() && !self.maps.sensors.contains_key(&sensor_id) => self
                .oem
                .as_mut()
                .map(|oem| {
                    oem.get_oem_state_sensor_readings(
                        probe.entity_type,
                        probe.entity_instance,
                        probe.state_set_id,
                        probe.composite_count,
                    )
                })
                .unwrap_or_else(|| Ok(Vec::new())),
            _ => self.read_bus_state_sensor(sensor_id, rearm_count),
        };

        match result {
            Ok(fields) => {
                encode_get_state_sensor_readings_resp(hdr.instance_id, ccode::SUCCESS, &fields)
            }
            Err(e) => Self::cc_only_response(hdr, e.completion_code()),
        }
    }

    fn read_bus_state_sensor(
        &mut self,
        sensor_id: u16,
        rearm_count: u8,
    ) -> Result<Vec<SensorStateField>> {
        let maps = self
            .maps
            .sensors
            .get(&sensor_id)
            .ok_or_else(|| Error::InvalidData(format!("unknown sensor id {}", sensor_id)))?;
        let composite_count = maps.mappings.len();
        if rearm_count as usize > composite_count {
            return Err(Error::InvalidData(format!(
                "sensor rearm count {} exceeds composite count {}",
                rearm_count, composite_count
            )));
        }

        let mut fields = Vec::with_capacity(composite_count);
        for offset in 0..composite_count {
            let field = match maps.mappings[offset].as_ref() {
                Some(mapping) => match self.bus.get(mapping) {
                    Ok(value) => {
                        let state = maps.value_maps[offset]
                            .iter()
                            .find(|(_, v)| *v == value)
                            .map(|(s, _)| *s);
                        match state {
                            Some(state) => SensorStateField {
                                sensor_op_state: SENSOR_OP_ENABLED,
                                present_state: state,
                                previous_state: state,
                                event_state: state,
                            },
                            None => SensorStateField {
                                sensor_op_state: SENSOR_OP_UNAVAILABLE,
                                ..SensorStateField::default()
                            },
                        }
                    }
                    Err(_) => SensorStateField {
                        sensor_op_state: SENSOR_OP_UNAVAILABLE,
                        ..SensorStateField::default()
                    },
                },
                None => SensorStateField {
                    sensor_op_state: SENSOR_OP_UNAVAILABLE,
                    ..SensorStateField::default()
                },
            };
            fields.push(field);
        }
        Ok(fields)
    }

    // ========================================================================
    // OEM range probing
    // ========================================================================

    fn in_oem_ranges(entity_type: u16, state_set_id: u16) -> bool {
        (OEM_ENTITY_TYPE_START..=OEM_ENTITY_TYPE_END).contains(&entity_type)
            || (OEM_STATE_SET_ID_START..OEM_STATE_SET_ID_END).contains(&state_set_id)
    }

    fn probe_oem_state_sensor(&self, sensor_id: u16, rearm_count: u8) -> Option<OemProbe> {
        let mut sensors = PdrRepo::new();
        self.repo.filter_by_type(PDR_TYPE_STATE_SENSOR, &mut sensors).ok()?;

        let mut cursor = sensors.get_first();
        while let Some(entry) = cursor {
            if let Ok((_, Pdr::StateSensor(pdr))) = Pdr::parse(entry.data) {
                if pdr.sensor_id == sensor_id {
                    let composite_count = pdr.composite.len() as u8;
                    if rearm_count > composite_count {
                        log::error!(
                            "[Handler::probe_oem_state_sensor] rearm count exceeds composite count, SENSOR_ID={} SENSOR_REARM_CNT={}",
                            sensor_id,
                            rearm_count
                        );
                        return None;
                    }
                    let state_set_id =
                        pdr.composite.first().map_or(0, |slot| slot.state_set_id);
                    if Self::in_oem_ranges(pdr.entity_type, state_set_id) {
                        return Some(OemProbe {
                            entity_type: pdr.entity_type,
                            entity_instance: pdr.entity_instance,
                            state_set_id,
                            composite_count,
                        });
                    }
                    return None;
                }
            }
            cursor = sensors.get_next(entry.record_handle);
        }
        None
    }

    fn probe_oem_state_effecter(&self, effecter_id: u16, composite_count: u8) -> Option<OemProbe> {
        let mut effecters = PdrRepo::new();
        self.repo
            .filter_by_type(PDR_TYPE_STATE_EFFECTER, &mut effecters)
            .ok()?;

        let mut cursor = effecters.get_first();
        while let Some(entry) = cursor {
            if let Ok((_, Pdr::StateEffecter(pdr))) = Pdr::parse(entry.data) {
                if pdr.effecter_id == effecter_id {
                    if composite_count > pdr.composite.len() as u8 {
                        log::error!(
                            "[Handler::probe_oem_state_effecter] composite count exceeds effecter's, EFFECTER_ID={} COMP_EFF_CNT={}",
                            effecter_id,
                            composite_count
                        );
                        return None;
                    }
                    let state_set_id =
                        pdr.composite.first().map_or(0, |slot| slot.state_set_id);
                    if Self::in_oem_ranges(pdr.entity_type, state_set_id) {
                        return Some(OemProbe {
                            entity_type: pdr.entity_type,
                            entity_instance: pdr.entity_instance,
                            state_set_id,
                            composite_count: pdr.composite.len() as u8,
                        });
                    }
                    return None;
                }
            }
            cursor = effecters.get_next(entry.record_handle);
        }
        None
    }
}
