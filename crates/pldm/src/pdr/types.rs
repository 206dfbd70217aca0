// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed platform descriptor records.
//!
//! A PDR is a tagged record: a common 10-byte header whose `pdr_type` field
//! selects the body layout. [`Pdr::parse`] decodes a packed record into the
//! matching variant; each variant packs back to the byte-exact wire form.
//!
//! # Common header
//!
//! ```text
//! +-------------------------------+-------+-------+---------------+
//! |        recordHandle (u32)     |  ver  | type  | changeNum(u16)|
//! +---------------+---------------+-------+-------+---------------+
//! | dataLength(u16)| body...
//! +---------------+
//! ```

use crate::error::{Error, Result};

/// Size of the common PDR header.
pub const PDR_HEADER_BYTES: usize = 10;

// PDR type codes (DSP0248 Table 78).
pub const PDR_TYPE_TERMINUS_LOCATOR: u8 = 1;
pub const PDR_TYPE_NUMERIC_SENSOR: u8 = 2;
pub const PDR_TYPE_STATE_SENSOR: u8 = 4;
pub const PDR_TYPE_NUMERIC_EFFECTER: u8 = 9;
pub const PDR_TYPE_STATE_EFFECTER: u8 = 11;
pub const PDR_TYPE_ENTITY_ASSOCIATION: u8 = 15;
pub const PDR_TYPE_OEM: u8 = 127;

// Terminus locator fields.
pub const TL_PDR_NOT_VALID: u8 = 0;
pub const TL_PDR_VALID: u8 = 1;
pub const TL_LOCATOR_TYPE_MCTP_EID: u8 = 1;

// OEM ranges probed by the responder's OEM dispatch.
pub const OEM_ENTITY_TYPE_START: u16 = 0x6000;
pub const OEM_ENTITY_TYPE_END: u16 = 0x7fff;
pub const OEM_STATE_SET_ID_START: u16 = 0x8000;
pub const OEM_STATE_SET_ID_END: u16 = 0xffff;

/// Common header prefix shared by every PDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdrHeader {
    pub record_handle: u32,
    pub version: u8,
    pub pdr_type: u8,
    pub record_change_num: u16,
    /// Body length in bytes (header excluded).
    pub length: u16,
}

impl PdrHeader {
    #[must_use]
    pub fn pack(&self) -> [u8; PDR_HEADER_BYTES] {
        let mut hdr = [0u8; PDR_HEADER_BYTES];
        hdr[0..4].copy_from_slice(&self.record_handle.to_le_bytes());
        hdr[4] = self.version;
        hdr[5] = self.pdr_type;
        hdr[6..8].copy_from_slice(&self.record_change_num.to_le_bytes());
        hdr[8..10].copy_from_slice(&self.length.to_le_bytes());
        hdr
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < PDR_HEADER_BYTES {
            return Err(Error::DecodeFailed("record shorter than PDR header"));
        }
        Ok(Self {
            record_handle: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            version: data[4],
            pdr_type: data[5],
            record_change_num: u16::from_le_bytes([data[6], data[7]]),
            length: u16::from_le_bytes([data[8], data[9]]),
        })
    }
}

/// Wrap a packed body into a full record with header.
///
/// `record_handle` 0 leaves assignment to the repository.
#[must_use]
pub fn pack_record(record_handle: u32, pdr_type: u8, body: &[u8]) -> Vec<u8> {
    let header = PdrHeader {
        record_handle,
        version: 1,
        pdr_type,
        record_change_num: 0,
        length: body.len() as u16,
    };
    let mut record = Vec::with_capacity(PDR_HEADER_BYTES + body.len());
    record.extend_from_slice(&header.pack());
    record.extend_from_slice(body);
    record
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    if data.len() < *pos + 2 {
        return Err(Error::DecodeFailed("truncated PDR field"));
    }
    let v = u16::from_le_bytes([data[*pos], data[*pos + 1]]);
    *pos += 2;
    Ok(v)
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    if data.len() < *pos + 4 {
        return Err(Error::DecodeFailed("truncated PDR field"));
    }
    let v = u32::from_le_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
    *pos += 4;
    Ok(v)
}

fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    if data.len() < *pos + 1 {
        return Err(Error::DecodeFailed("truncated PDR field"));
    }
    let v = data[*pos];
    *pos += 1;
    Ok(v)
}

// ============================================================================
// TERMINUS LOCATOR
// ============================================================================

/// Terminus locator PDR with an MCTP EID locator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminusLocatorPdr {
    pub terminus_handle: u16,
    pub validity: u8,
    pub tid: u8,
    pub container_id: u16,
    pub eid: u8,
}

impl TerminusLocatorPdr {
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(9);
        body.extend_from_slice(&self.terminus_handle.to_le_bytes());
        body.push(self.validity);
        body.push(self.tid);
        body.extend_from_slice(&self.container_id.to_le_bytes());
        body.push(TL_LOCATOR_TYPE_MCTP_EID);
        body.push(1); // locator value size: one EID byte
        body.push(self.eid);
        pack_record(0, PDR_TYPE_TERMINUS_LOCATOR, &body)
    }

    pub fn unpack(body: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let terminus_handle = read_u16(body, &mut pos)?;
        let validity = read_u8(body, &mut pos)?;
        let tid = read_u8(body, &mut pos)?;
        let container_id = read_u16(body, &mut pos)?;
        let locator_type = read_u8(body, &mut pos)?;
        let locator_size = read_u8(body, &mut pos)?;
        if locator_type != TL_LOCATOR_TYPE_MCTP_EID || locator_size != 1 {
            return Err(Error::InvalidData(format!(
                "unsupported terminus locator type {} size {}",
                locator_type, locator_size
            )));
        }
        let eid = read_u8(body, &mut pos)?;
        Ok(Self {
            terminus_handle,
            validity,
            tid,
            container_id,
            eid,
        })
    }
}

// ============================================================================
// STATE SENSOR / STATE EFFECTER
// ============================================================================

/// One composite slot's state set and its possible-states bitfield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibleStates {
    pub state_set_id: u16,
    /// Bitfield, one bit per state number, LSB of byte 0 = state 0.
    pub states: Vec<u8>,
}

impl PossibleStates {
    /// Build the bitfield from a list of state numbers.
    #[must_use]
    pub fn from_states(state_set_id: u16, states: &[u8]) -> Self {
        let max = states.iter().copied().max().unwrap_or(0) as usize;
        let mut bits = vec![0u8; max / 8 + 1];
        for &s in states {
            bits[s as usize / 8] |= 1 << (s % 8);
        }
        Self {
            state_set_id,
            states: bits,
        }
    }

    /// Whether `state` is one of the possible states.
    #[must_use]
    pub fn contains(&self, state: u8) -> bool {
        self.states
            .get(state as usize / 8)
            .is_some_and(|byte| byte & (1 << (state % 8)) != 0)
    }

    fn pack_into(&self, body: &mut Vec<u8>) {
        body.extend_from_slice(&self.state_set_id.to_le_bytes());
        body.push(self.states.len() as u8);
        body.extend_from_slice(&self.states);
    }

    fn unpack_from(data: &[u8], pos: &mut usize) -> Result<Self> {
        let state_set_id = read_u16(data, pos)?;
        let size = read_u8(data, pos)? as usize;
        if data.len() < *pos + size {
            return Err(Error::DecodeFailed("truncated possible states bitfield"));
        }
        let states = data[*pos..*pos + size].to_vec();
        *pos += size;
        Ok(Self {
            state_set_id,
            states,
        })
    }
}

/// State sensor PDR (composite capable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSensorPdr {
    pub terminus_handle: u16,
    pub sensor_id: u16,
    pub entity_type: u16,
    pub entity_instance: u16,
    pub container_id: u16,
    pub sensor_init: u8,
    pub sensor_auxiliary_names: bool,
    pub composite: Vec<PossibleStates>,
}

impl StateSensorPdr {
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.terminus_handle.to_le_bytes());
        body.extend_from_slice(&self.sensor_id.to_le_bytes());
        body.extend_from_slice(&self.entity_type.to_le_bytes());
        body.extend_from_slice(&self.entity_instance.to_le_bytes());
        body.extend_from_slice(&self.container_id.to_le_bytes());
        body.push(self.sensor_init);
        body.push(u8::from(self.sensor_auxiliary_names));
        body.push(self.composite.len() as u8);
        for slot in &self.composite {
            slot.pack_into(&mut body);
        }
        pack_record(0, PDR_TYPE_STATE_SENSOR, &body)
    }

    pub fn unpack(body: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let terminus_handle = read_u16(body, &mut pos)?;
        let sensor_id = read_u16(body, &mut pos)?;
        let entity_type = read_u16(body, &mut pos)?;
        let entity_instance = read_u16(body, &mut pos)?;
        let container_id = read_u16(body, &mut pos)?;
        let sensor_init = read_u8(body, &mut pos)?;
        let sensor_auxiliary_names = read_u8(body, &mut pos)? != 0;
        let count = read_u8(body, &mut pos)? as usize;
        let mut composite = Vec::with_capacity(count);
        for _ in 0..count {
            composite.push(PossibleStates::unpack_from(body, &mut pos)?);
        }
        Ok(Self {
            terminus_handle,
            sensor_id,
            entity_type,
            entity_instance,
            container_id,
            sensor_init,
            sensor_auxiliary_names,
            composite,
        })
    }
}

/// State effecter PDR (composite capable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEffecterPdr {
    pub terminus_handle: u16,
    pub effecter_id: u16,
    pub entity_type: u16,
    pub entity_instance: u16,
    pub container_id: u16,
    pub effecter_semantic_id: u16,
    pub effecter_init: u8,
    pub has_description_pdr: bool,
    pub composite: Vec<PossibleStates>,
}

impl StateEffecterPdr {
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.terminus_handle.to_le_bytes());
        body.extend_from_slice(&self.effecter_id.to_le_bytes());
        body.extend_from_slice(&self.entity_type.to_le_bytes());
        body.extend_from_slice(&self.entity_instance.to_le_bytes());
        body.extend_from_slice(&self.container_id.to_le_bytes());
        body.extend_from_slice(&self.effecter_semantic_id.to_le_bytes());
        body.push(self.effecter_init);
        body.push(u8::from(self.has_description_pdr));
        body.push(self.composite.len() as u8);
        for slot in &self.composite {
            slot.pack_into(&mut body);
        }
        pack_record(0, PDR_TYPE_STATE_EFFECTER, &body)
    }

    pub fn unpack(body: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let terminus_handle = read_u16(body, &mut pos)?;
        let effecter_id = read_u16(body, &mut pos)?;
        let entity_type = read_u16(body, &mut pos)?;
        let entity_instance = read_u16(body, &mut pos)?;
        let container_id = read_u16(body, &mut pos)?;
        let effecter_semantic_id = read_u16(body, &mut pos)?;
        let effecter_init = read_u8(body, &mut pos)?;
        let has_description_pdr = read_u8(body, &mut pos)? != 0;
        let count = read_u8(body, &mut pos)? as usize;
        let mut composite = Vec::with_capacity(count);
        for _ in 0..count {
            composite.push(PossibleStates::unpack_from(body, &mut pos)?);
        }
        Ok(Self {
            terminus_handle,
            effecter_id,
            entity_type,
            entity_instance,
            container_id,
            effecter_semantic_id,
            effecter_init,
            has_description_pdr,
            composite,
        })
    }
}

// ============================================================================
// NUMERIC EFFECTER
// ============================================================================

/// Numeric effecter value PDR.
///
/// Range and settable fields are carried as fixed 32-bit slots regardless of
/// `effecter_data_size`, matching the packed responder layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericEffecterPdr {
    pub terminus_handle: u16,
    pub effecter_id: u16,
    pub entity_type: u16,
    pub entity_instance: u16,
    pub container_id: u16,
    pub effecter_semantic_id: u16,
    pub effecter_init: u8,
    pub effecter_auxiliary_names: bool,
    pub base_unit: u8,
    pub unit_modifier: i8,
    pub rate_unit: u8,
    pub base_oem_unit_handle: u8,
    pub aux_unit: u8,
    pub aux_unit_modifier: i8,
    pub aux_rate_unit: u8,
    pub aux_oem_unit_handle: u8,
    pub is_linear: bool,
    pub effecter_data_size: u8,
    pub resolution: f32,
    pub offset: f32,
    pub accuracy: u16,
    pub plus_tolerance: u8,
    pub minus_tolerance: u8,
    pub state_transition_interval: f32,
    pub transition_interval: f32,
    pub max_settable: u32,
    pub min_settable: u32,
    pub range_field_format: u8,
    pub range_field_support: u8,
    pub nominal_value: u32,
    pub normal_max: u32,
    pub normal_min: u32,
    pub rated_max: u32,
    pub rated_min: u32,
}

impl NumericEffecterPdr {
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(74);
        body.extend_from_slice(&self.terminus_handle.to_le_bytes());
        body.extend_from_slice(&self.effecter_id.to_le_bytes());
        body.extend_from_slice(&self.entity_type.to_le_bytes());
        body.extend_from_slice(&self.entity_instance.to_le_bytes());
        body.extend_from_slice(&self.container_id.to_le_bytes());
        body.extend_from_slice(&self.effecter_semantic_id.to_le_bytes());
        body.push(self.effecter_init);
        body.push(u8::from(self.effecter_auxiliary_names));
        body.push(self.base_unit);
        body.push(self.unit_modifier as u8);
        body.push(self.rate_unit);
        body.push(self.base_oem_unit_handle);
        body.push(self.aux_unit);
        body.push(self.aux_unit_modifier as u8);
        body.push(self.aux_rate_unit);
        body.push(self.aux_oem_unit_handle);
        body.push(u8::from(self.is_linear));
        body.push(self.effecter_data_size);
        body.extend_from_slice(&self.resolution.to_le_bytes());
        body.extend_from_slice(&self.offset.to_le_bytes());
        body.extend_from_slice(&self.accuracy.to_le_bytes());
        body.push(self.plus_tolerance);
        body.push(self.minus_tolerance);
        body.extend_from_slice(&self.state_transition_interval.to_le_bytes());
        body.extend_from_slice(&self.transition_interval.to_le_bytes());
        body.extend_from_slice(&self.max_settable.to_le_bytes());
        body.extend_from_slice(&self.min_settable.to_le_bytes());
        body.push(self.range_field_format);
        body.push(self.range_field_support);
        body.extend_from_slice(&self.nominal_value.to_le_bytes());
        body.extend_from_slice(&self.normal_max.to_le_bytes());
        body.extend_from_slice(&self.normal_min.to_le_bytes());
        body.extend_from_slice(&self.rated_max.to_le_bytes());
        body.extend_from_slice(&self.rated_min.to_le_bytes());
        pack_record(0, PDR_TYPE_NUMERIC_EFFECTER, &body)
    }

    pub fn unpack(body: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let terminus_handle = read_u16(body, &mut pos)?;
        let effecter_id = read_u16(body, &mut pos)?;
        let entity_type = read_u16(body, &mut pos)?;
        let entity_instance = read_u16(body, &mut pos)?;
        let container_id = read_u16(body, &mut pos)?;
        let effecter_semantic_id = read_u16(body, &mut pos)?;
        let effecter_init = read_u8(body, &mut pos)?;
        let effecter_auxiliary_names = read_u8(body, &mut pos)? != 0;
        let base_unit = read_u8(body, &mut pos)?;
        let unit_modifier = read_u8(body, &mut pos)? as i8;
        let rate_unit = read_u8(body, &mut pos)?;
        let base_oem_unit_handle = read_u8(body, &mut pos)?;
        let aux_unit = read_u8(body, &mut pos)?;
        let aux_unit_modifier = read_u8(body, &mut pos)? as i8;
        let aux_rate_unit = read_u8(body, &mut pos)?;
        let aux_oem_unit_handle = read_u8(body, &mut pos)?;
        let is_linear = read_u8(body, &mut pos)? != 0;
        let effecter_data_size = read_u8(body, &mut pos)?;
        let resolution = f32::from_le_bytes([
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
        ]);
        let offset = f32::from_le_bytes([
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
        ]);
        let accuracy = read_u16(body, &mut pos)?;
        let plus_tolerance = read_u8(body, &mut pos)?;
        let minus_tolerance = read_u8(body, &mut pos)?;
        let state_transition_interval = f32::from_le_bytes([
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
        ]);
        let transition_interval = f32::from_le_bytes([
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
            read_u8(body, &mut pos)?,
        ]);
        let max_settable = read_u32(body, &mut pos)?;
        let min_settable = read_u32(body, &mut pos)?;
        let range_field_format = read_u8(body, &mut pos)?;
        let range_field_support = read_u8(body, &mut pos)?;
        let nominal_value = read_u32(body, &mut pos)?;
        let normal_max = read_u32(body, &mut pos)?;
        let normal_min = read_u32(body, &mut pos)?;
        let rated_max = read_u32(body, &mut pos)?;
        let rated_min = read_u32(body, &mut pos)?;
        Ok(Self {
            terminus_handle,
            effecter_id,
            entity_type,
            entity_instance,
            container_id,
            effecter_semantic_id,
            effecter_init,
            effecter_auxiliary_names,
            base_unit,
            unit_modifier,
            rate_unit,
            base_oem_unit_handle,
            aux_unit,
            aux_unit_modifier,
            aux_rate_unit,
            aux_oem_unit_handle,
            is_linear,
            effecter_data_size,
            resolution,
            offset,
            accuracy,
            plus_tolerance,
            minus_tolerance,
            state_transition_interval,
            transition_interval,
            max_settable,
            min_settable,
            range_field_format,
            range_field_support,
            nominal_value,
            normal_max,
            normal_min,
            rated_max,
            rated_min,
        })
    }
}

// ============================================================================
// ENTITY ASSOCIATION
// ============================================================================

/// Entity reference inside an association PDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: u16,
    pub entity_instance: u16,
    pub container_id: u16,
}

/// Entity association PDR (containment tree edge set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAssociationPdr {
    pub container_id: u16,
    pub association_type: u8,
    pub container: EntityRef,
    pub children: Vec<EntityRef>,
}

impl EntityAssociationPdr {
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.container_id.to_le_bytes());
        body.push(self.association_type);
        for entity in std::iter::once(&self.container).chain(self.children.iter()) {
            body.extend_from_slice(&entity.entity_type.to_le_bytes());
            body.extend_from_slice(&entity.entity_instance.to_le_bytes());
            body.extend_from_slice(&entity.container_id.to_le_bytes());
        }
        // child count sits between container entity and children
        body.insert(9, self.children.len() as u8);
        pack_record(0, PDR_TYPE_ENTITY_ASSOCIATION, &body)
    }

    pub fn unpack(body: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let container_id = read_u16(body, &mut pos)?;
        let association_type = read_u8(body, &mut pos)?;
        let container = EntityRef {
            entity_type: read_u16(body, &mut pos)?,
            entity_instance: read_u16(body, &mut pos)?,
            container_id: read_u16(body, &mut pos)?,
        };
        let count = read_u8(body, &mut pos)? as usize;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            children.push(EntityRef {
                entity_type: read_u16(body, &mut pos)?,
                entity_instance: read_u16(body, &mut pos)?,
                container_id: read_u16(body, &mut pos)?,
            });
        }
        Ok(Self {
            container_id,
            association_type,
            container,
            children,
        })
    }
}

// ============================================================================
// TAGGED RECORD
// ============================================================================

/// A decoded PDR, tagged by its header type.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdr {
    TerminusLocator(TerminusLocatorPdr),
    StateSensor(StateSensorPdr),
    StateEffecter(StateEffecterPdr),
    NumericEffecter(NumericEffecterPdr),
    EntityAssociation(EntityAssociationPdr),
    /// Unrecognized or OEM-specific body, kept opaque.
    Oem(Vec<u8>),
}

impl Pdr {
    /// Decode a packed record (header + body) into its typed form.
    pub fn parse(record: &[u8]) -> Result<(PdrHeader, Pdr)> {
        let header = PdrHeader::unpack(record)?;
        let body = &record[PDR_HEADER_BYTES..];
        let pdr = match header.pdr_type {
            PDR_TYPE_TERMINUS_LOCATOR => Pdr::TerminusLocator(TerminusLocatorPdr::unpack(body)?),
            PDR_TYPE_STATE_SENSOR => Pdr::StateSensor(StateSensorPdr::unpack(body)?),
            PDR_TYPE_STATE_EFFECTER => Pdr::StateEffecter(StateEffecterPdr::unpack(body)?),
            PDR_TYPE_NUMERIC_EFFECTER => Pdr::NumericEffecter(NumericEffecterPdr::unpack(body)?),
            PDR_TYPE_ENTITY_ASSOCIATION => {
                Pdr::EntityAssociation(EntityAssociationPdr::unpack(body)?)
            }
            _ => Pdr::Oem(body.to_vec()),
        };
        Ok((header, pdr))
    }
}

/// Terminus handle embedded in a packed record, for the record types that
/// carry one at body offset 0.
#[must_use]
pub fn embedded_terminus_handle(record: &[u8]) -> Option<u16> {
    let header = PdrHeader::unpack(record).ok()?;
    match header.pdr_type {
        PDR_TYPE_TERMINUS_LOCATOR
        | PDR_TYPE_NUMERIC_SENSOR
        | PDR_TYPE_STATE_SENSOR
        | PDR_TYPE_NUMERIC_EFFECTER
        | PDR_TYPE_STATE_EFFECTER => {
            let body = &record[PDR_HEADER_BYTES..];
            if body.len() < 2 {
                return None;
            }
            Some(u16::from_le_bytes([body[0], body[1]]))
        }
        _ => None,
    }
}
