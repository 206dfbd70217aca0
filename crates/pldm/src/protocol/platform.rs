// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform monitoring & control command codecs (DSP0248).
//!
//! Request/response bodies for the command set the responder and the event
//! poller touch:
//!
//! - GetPDR / pollForPlatformEventMessage / platformEventMessage
//! - setStateEffecterStates / setNumericEffecterValue
//! - getStateSensorReadings
//! - event-data decoders (sensor, message poll, PDR repository change)
//!
//! Encoders produce full messages (header included); decoders take the
//! payload after the header and length-check every access.

use super::{build_request, build_response, ccode, TransferFlag, TransferOperation};
use crate::error::{Error, Result};

// ============================================================================
// COMMAND IDS (DSP0248 Table 2)
// ============================================================================

pub const CMD_GET_STATE_SENSOR_READINGS: u8 = 0x21;
pub const CMD_SET_NUMERIC_EFFECTER_VALUE: u8 = 0x31;
pub const CMD_SET_STATE_EFFECTER_STATES: u8 = 0x39;
pub const CMD_GET_PDR: u8 = 0x51;
pub const CMD_PLATFORM_EVENT_MESSAGE: u8 = 0x0a;
pub const CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE: u8 = 0x0d;

// ============================================================================
// EVENT CLASSES (DSP0248 Table 11)
// ============================================================================

pub const EVENT_CLASS_SENSOR: u8 = 0x00;
pub const EVENT_CLASS_EFFECTER: u8 = 0x01;
pub const EVENT_CLASS_REDFISH_TASK_EXECUTED: u8 = 0x02;
pub const EVENT_CLASS_REDFISH_MESSAGE: u8 = 0x03;
pub const EVENT_CLASS_PDR_REPOSITORY_CHG: u8 = 0x04;
pub const EVENT_CLASS_MESSAGE_POLL: u8 = 0x05;
pub const EVENT_CLASS_HEARTBEAT_TIMER_ELAPSED: u8 = 0x06;

/// Sensor event sub-classes (sensorEventClass field).
pub const SENSOR_EVENT_SENSOR_OP_STATE: u8 = 0x00;
pub const SENSOR_EVENT_STATE_SENSOR_STATE: u8 = 0x01;
pub const SENSOR_EVENT_NUMERIC_SENSOR_STATE: u8 = 0x02;

/// Platform event message status: event not logged by the receiver.
pub const EVENT_NO_LOGGING: u8 = 0x00;

/// Reserved event id meaning "no event pending".
pub const EVENT_ID_NONE: u16 = 0x0000;

/// Reserved event id instructing the poller to stop.
pub const EVENT_ID_TERMINATE: u16 = 0xffff;

// ============================================================================
// PDR REPOSITORY CHANGE EVENT (DSP0248 Table 17/18)
// ============================================================================

pub const REFRESH_ENTIRE_REPOSITORY: u8 = 0x00;
pub const FORMAT_IS_PDR_TYPES: u8 = 0x01;
pub const FORMAT_IS_PDR_HANDLES: u8 = 0x02;

pub const RECORDS_REFRESH_ALL: u8 = 0x00;
pub const RECORDS_DELETED: u8 = 0x01;
pub const RECORDS_ADDED: u8 = 0x02;
pub const RECORDS_MODIFIED: u8 = 0x03;

// ============================================================================
// FIXED SIZES
// ============================================================================

pub const POLL_FOR_EVENT_REQ_BYTES: usize = 8;
/// Response carrying only cc/tid/eventId (sentinel ids, ack responses).
pub const POLL_FOR_EVENT_MIN_RESP_BYTES: usize = 4;
/// Response carrying a transfer part, excluding data and checksum.
pub const POLL_FOR_EVENT_PART_RESP_BYTES: usize = 14;
pub const PLATFORM_EVENT_MESSAGE_MIN_REQ_BYTES: usize = 3;
pub const PLATFORM_EVENT_MESSAGE_RESP_BYTES: usize = 2;
pub const GET_PDR_REQ_BYTES: usize = 13;
pub const GET_PDR_MIN_RESP_BYTES: usize = 12;
pub const GET_STATE_SENSOR_READINGS_REQ_BYTES: usize = 4;
pub const MESSAGE_POLL_EVENT_DATA_BYTES: usize = 7;
pub const STATE_SENSOR_EVENT_DATA_BYTES: usize = 3;
/// Maximum composite count in a setStateEffecterStates request.
pub const MAX_COMPOSITE_EFFECTER_COUNT: usize = 8;

// ============================================================================
// SENSOR READING SIZES
// ============================================================================

/// Width selector for numeric sensor readings and effecter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorDataSize {
    Uint8 = 0x00,
    Sint8 = 0x01,
    Uint16 = 0x02,
    Sint16 = 0x03,
    Uint32 = 0x04,
    Sint32 = 0x05,
}

impl SensorDataSize {
    /// Number of bytes the reading occupies on the wire.
    #[must_use]
    pub fn byte_len(self) -> usize {
        match self {
            SensorDataSize::Uint8 | SensorDataSize::Sint8 => 1,
            SensorDataSize::Uint16 | SensorDataSize::Sint16 => 2,
            SensorDataSize::Uint32 | SensorDataSize::Sint32 => 4,
        }
    }
}

impl TryFrom<u8> for SensorDataSize {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(SensorDataSize::Uint8),
            0x01 => Ok(SensorDataSize::Sint8),
            0x02 => Ok(SensorDataSize::Uint16),
            0x03 => Ok(SensorDataSize::Sint16),
            0x04 => Ok(SensorDataSize::Uint32),
            0x05 => Ok(SensorDataSize::Sint32),
            other => Err(Error::InvalidData(format!(
                "unknown sensor data size {:#04x}",
                other
            ))),
        }
    }
}

/// Read a zero-extended little-endian reading of `size` width at `data[0..]`.
fn read_reading(size: SensorDataSize, data: &[u8]) -> Result<u32> {
    let len = size.byte_len();
    if data.len() < len {
        return Err(Error::DecodeFailed("truncated sensor reading"));
    }
    let mut value = 0u32;
    for (i, &byte) in data[..len].iter().enumerate() {
        value |= u32::from(byte) << (8 * i);
    }
    Ok(value)
}

// ============================================================================
// POLL FOR PLATFORM EVENT MESSAGE (0x0D)
// ============================================================================

/// Request body of pollForPlatformEventMessage.
///
/// # Wire Format
///
/// ```text
/// +---------------+---------------+-------------------------------+
/// | formatVersion |  transferOp   |      dataTransferHandle       |
/// +---------------+---------------+    (u32)                      |
/// |     ...       +---------------+-------------------------------+
/// |        eventIdToAcknowledge (u16)                             |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollForEventRequest {
    pub format_version: u8,
    pub operation: TransferOperation,
    pub data_transfer_handle: u32,
    pub event_id_to_ack: u16,
}

/// Encode a pollForPlatformEventMessage request (full message).
#[must_use]
pub fn encode_poll_for_event_req(instance_id: u8, req: &PollForEventRequest) -> Vec<u8> {
    let mut payload = Vec::with_capacity(POLL_FOR_EVENT_REQ_BYTES);
    payload.push(req.format_version);
    payload.push(req.operation as u8);
    payload.extend_from_slice(&req.data_transfer_handle.to_le_bytes());
    payload.extend_from_slice(&req.event_id_to_ack.to_le_bytes());
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE,
        &payload,
    )
}

/// Decode a pollForPlatformEventMessage request payload.
pub fn decode_poll_for_event_req(payload: &[u8]) -> Result<PollForEventRequest> {
    if payload.len() != POLL_FOR_EVENT_REQ_BYTES {
        return Err(Error::InvalidLength);
    }
    Ok(PollForEventRequest {
        format_version: payload[0],
        operation: TransferOperation::try_from(payload[1])?,
        data_transfer_handle: u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]),
        event_id_to_ack: u16::from_le_bytes([payload[6], payload[7]]),
    })
}

/// Decoded pollForPlatformEventMessage response.
///
/// When `event_id` is one of the reserved sentinels the terminus sends only
/// `completionCode`/`tid`/`eventId`; the remaining fields decode as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollForEventResponse {
    pub completion_code: u8,
    pub tid: u8,
    pub event_id: u16,
    pub next_data_transfer_handle: u32,
    pub transfer_flag: u8,
    pub event_class: u8,
    pub event_data: Vec<u8>,
    /// CRC-32 over the full reassembled event data. Only meaningful when
    /// `transfer_flag` is `End` or `StartAndEnd`.
    pub checksum: u32,
}

/// Encode a pollForPlatformEventMessage response (full message).
///
/// The checksum field is appended only for `End` / `StartAndEnd` parts, and
/// only full-part responses carry the transfer fields at all.
#[must_use]
pub fn encode_poll_for_event_resp(instance_id: u8, resp: &PollForEventResponse) -> Vec<u8> {
    let mut payload = Vec::with_capacity(POLL_FOR_EVENT_PART_RESP_BYTES + resp.event_data.len() + 4);
    payload.push(resp.completion_code);
    payload.push(resp.tid);
    payload.extend_from_slice(&resp.event_id.to_le_bytes());
    if resp.event_id != EVENT_ID_NONE && resp.event_id != EVENT_ID_TERMINATE {
        payload.extend_from_slice(&resp.next_data_transfer_handle.to_le_bytes());
        payload.push(resp.transfer_flag);
        payload.push(resp.event_class);
        payload.extend_from_slice(&(resp.event_data.len() as u32).to_le_bytes());
        payload.extend_from_slice(&resp.event_data);
        if matches!(
            TransferFlag::try_from(resp.transfer_flag),
            Ok(TransferFlag::End | TransferFlag::StartAndEnd)
        ) {
            payload.extend_from_slice(&resp.checksum.to_le_bytes());
        }
    }
    build_response(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE,
        &payload,
    )
}

/// Decode a pollForPlatformEventMessage response payload.
pub fn decode_poll_for_event_resp(payload: &[u8]) -> Result<PollForEventResponse> {
    if payload.len() < POLL_FOR_EVENT_MIN_RESP_BYTES {
        return Err(Error::DecodeFailed("poll response shorter than minimum"));
    }
    let completion_code = payload[0];
    let tid = payload[1];
    let event_id = u16::from_le_bytes([payload[2], payload[3]]);

    let mut resp = PollForEventResponse {
        completion_code,
        tid,
        event_id,
        ..PollForEventResponse::default()
    };
    if completion_code != ccode::SUCCESS
        || event_id == EVENT_ID_NONE
        || event_id == EVENT_ID_TERMINATE
        || payload.len() == POLL_FOR_EVENT_MIN_RESP_BYTES
    {
        return Ok(resp);
    }

    if payload.len() < POLL_FOR_EVENT_PART_RESP_BYTES {
        return Err(Error::DecodeFailed("poll response truncated transfer part"));
    }
    resp.next_data_transfer_handle =
        u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    resp.transfer_flag = payload[8];
    resp.event_class = payload[9];
    let data_size =
        u32::from_le_bytes([payload[10], payload[11], payload[12], payload[13]]) as usize;

    let data_end = POLL_FOR_EVENT_PART_RESP_BYTES
        .checked_add(data_size)
        .ok_or(Error::DecodeFailed("event data size overflow"))?;
    if payload.len() < data_end {
        return Err(Error::DecodeFailed("event data exceeds message length"));
    }
    resp.event_data = payload[POLL_FOR_EVENT_PART_RESP_BYTES..data_end].to_vec();

    if matches!(
        TransferFlag::try_from(resp.transfer_flag),
        Ok(TransferFlag::End | TransferFlag::StartAndEnd)
    ) {
        let crc_end = data_end + 4;
        if payload.len() < crc_end {
            return Err(Error::DecodeFailed("missing event data checksum"));
        }
        resp.checksum = u32::from_le_bytes([
            payload[data_end],
            payload[data_end + 1],
            payload[data_end + 2],
            payload[data_end + 3],
        ]);
    }
    Ok(resp)
}

// ============================================================================
// PLATFORM EVENT MESSAGE (0x0A)
// ============================================================================

/// Decode a platformEventMessage request payload.
///
/// Returns `(format_version, tid, event_class, event_data)`.
pub fn decode_platform_event_message_req(payload: &[u8]) -> Result<(u8, u8, u8, &[u8])> {
    if payload.len() < PLATFORM_EVENT_MESSAGE_MIN_REQ_BYTES {
        return Err(Error::InvalidLength);
    }
    Ok((payload[0], payload[1], payload[2], &payload[3..]))
}

/// Encode a platformEventMessage request (full message). Used by termini
/// pushing events and by the test fixtures.
#[must_use]
pub fn encode_platform_event_message_req(
    instance_id: u8,
    format_version: u8,
    tid: u8,
    event_class: u8,
    event_data: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(PLATFORM_EVENT_MESSAGE_MIN_REQ_BYTES + event_data.len());
    payload.push(format_version);
    payload.push(tid);
    payload.push(event_class);
    payload.extend_from_slice(event_data);
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_PLATFORM_EVENT_MESSAGE,
        &payload,
    )
}

/// Encode a platformEventMessage response (full message).
#[must_use]
pub fn encode_platform_event_message_resp(
    instance_id: u8,
    completion_code: u8,
    status: u8,
) -> Vec<u8> {
    build_response(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_PLATFORM_EVENT_MESSAGE,
        &[completion_code, status],
    )
}

// ============================================================================
// SENSOR EVENT DATA
// ============================================================================

/// Decode the common sensor event prefix.
///
/// Returns `(sensor_id, sensor_event_class, class_data)`.
pub fn decode_sensor_event_data(data: &[u8]) -> Result<(u16, u8, &[u8])> {
    if data.len() < 3 {
        return Err(Error::DecodeFailed("sensor event data too short"));
    }
    let sensor_id = u16::from_le_bytes([data[0], data[1]]);
    Ok((sensor_id, data[2], &data[3..]))
}

/// stateSensorState class data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSensorData {
    pub sensor_offset: u8,
    pub event_state: u8,
    pub previous_event_state: u8,
}

/// Decode stateSensorState class data.
pub fn decode_state_sensor_data(data: &[u8]) -> Result<StateSensorData> {
    if data.len() < STATE_SENSOR_EVENT_DATA_BYTES {
        return Err(Error::DecodeFailed("state sensor data too short"));
    }
    Ok(StateSensorData {
        sensor_offset: data[0],
        event_state: data[1],
        previous_event_state: data[2],
    })
}

/// numericSensorState class data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSensorData {
    pub event_state: u8,
    pub previous_event_state: u8,
    pub data_size: SensorDataSize,
    pub present_reading: u32,
}

/// Decode numericSensorState class data. The reading is zero-extended.
pub fn decode_numeric_sensor_data(data: &[u8]) -> Result<NumericSensorData> {
    if data.len() < 4 {
        return Err(Error::DecodeFailed("numeric sensor data too short"));
    }
    let data_size = SensorDataSize::try_from(data[2])?;
    Ok(NumericSensorData {
        event_state: data[0],
        previous_event_state: data[1],
        data_size,
        present_reading: read_reading(data_size, &data[3..])?,
    })
}

// ============================================================================
// MESSAGE POLL EVENT DATA
// ============================================================================

/// pldmMessagePollEvent class data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePollEventData {
    pub format_version: u8,
    pub event_id: u16,
    pub data_transfer_handle: u32,
}

/// Decode pldmMessagePollEvent class data.
pub fn decode_message_poll_event_data(data: &[u8]) -> Result<MessagePollEventData> {
    if data.len() < MESSAGE_POLL_EVENT_DATA_BYTES {
        return Err(Error::DecodeFailed("message poll event data too short"));
    }
    Ok(MessagePollEventData {
        format_version: data[0],
        event_id: u16::from_le_bytes([data[1], data[2]]),
        data_transfer_handle: u32::from_le_bytes([data[3], data[4], data[5], data[6]]),
    })
}

/// Encode pldmMessagePollEvent class data.
#[must_use]
pub fn encode_message_poll_event_data(event: &MessagePollEventData) -> Vec<u8> {
    let mut data = Vec::with_capacity(MESSAGE_POLL_EVENT_DATA_BYTES);
    data.push(event.format_version);
    data.extend_from_slice(&event.event_id.to_le_bytes());
    data.extend_from_slice(&event.data_transfer_handle.to_le_bytes());
    data
}

// ============================================================================
// PDR REPOSITORY CHANGE EVENT DATA
// ============================================================================

/// One change record of a pdrRepositoryChgEvent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub operation: u8,
    pub handles: Vec<u32>,
}

/// Decode the pdrRepositoryChgEvent prefix.
///
/// Returns `(event_data_format, change_records_data)`. The declared record
/// count is validated while parsing the records themselves.
pub fn decode_repository_chg_event_data(data: &[u8]) -> Result<(u8, u8, &[u8])> {
    if data.len() < 2 {
        return Err(Error::DecodeFailed("repository change event too short"));
    }
    Ok((data[0], data[1], &data[2..]))
}

/// Parse the change-record list following the event prefix.
///
/// Each record is `{operation, numberOfChangeEntries, entries: [u32]}`. A
/// record whose declared entry count exceeds the remaining bytes is
/// rejected.
pub fn parse_change_records(mut data: &[u8]) -> Result<Vec<ChangeRecord>> {
    let mut records = Vec::new();
    while !data.is_empty() {
        if data.len() < 2 {
            return Err(Error::DecodeFailed("truncated change record header"));
        }
        let operation = data[0];
        let entry_count = data[1] as usize;
        let entries_data = &data[2..];
        if entry_count > entries_data.len() / 4 {
            return Err(Error::InvalidData(
                "change record entry count exceeds payload".to_string(),
            ));
        }
        let mut handles = Vec::with_capacity(entry_count);
        for chunk in entries_data[..entry_count * 4].chunks_exact(4) {
            handles.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        records.push(ChangeRecord { operation, handles });
        data = &entries_data[entry_count * 4..];
    }
    Ok(records)
}

/// Encode a pdrRepositoryChgEvent event-data blob.
#[must_use]
pub fn encode_repository_chg_event_data(format: u8, records: &[ChangeRecord]) -> Vec<u8> {
    let mut data = vec![format, records.len() as u8];
    for record in records {
        data.push(record.operation);
        data.push(record.handles.len() as u8);
        for handle in &record.handles {
            data.extend_from_slice(&handle.to_le_bytes());
        }
    }
    data
}

// ============================================================================
// GET PDR (0x51)
// ============================================================================

/// Decoded GetPDR request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPdrRequest {
    pub record_handle: u32,
    pub data_transfer_handle: u32,
    pub transfer_operation: TransferOperation,
    pub request_count: u16,
    pub record_change_number: u16,
}

/// Decode a GetPDR request payload.
pub fn decode_get_pdr_req(payload: &[u8]) -> Result<GetPdrRequest> {
    if payload.len() != GET_PDR_REQ_BYTES {
        return Err(Error::InvalidLength);
    }
    Ok(GetPdrRequest {
        record_handle: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        data_transfer_handle: u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        transfer_operation: TransferOperation::try_from(payload[8])?,
        request_count: u16::from_le_bytes([payload[9], payload[10]]),
        record_change_number: u16::from_le_bytes([payload[11], payload[12]]),
    })
}

/// Encode a GetPDR request (full message).
#[must_use]
pub fn encode_get_pdr_req(instance_id: u8, req: &GetPdrRequest) -> Vec<u8> {
    let mut payload = Vec::with_capacity(GET_PDR_REQ_BYTES);
    payload.extend_from_slice(&req.record_handle.to_le_bytes());
    payload.extend_from_slice(&req.data_transfer_handle.to_le_bytes());
    payload.push(req.transfer_operation as u8);
    payload.extend_from_slice(&req.request_count.to_le_bytes());
    payload.extend_from_slice(&req.record_change_number.to_le_bytes());
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_GET_PDR,
        &payload,
    )
}

/// Encode a GetPDR response (full message).
///
/// The responder always hands back whole records, so the transfer flag is
/// `StartAndEnd` and no transfer CRC trails the data.
#[must_use]
pub fn encode_get_pdr_resp(
    instance_id: u8,
    completion_code: u8,
    next_record_handle: u32,
    record_data: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(GET_PDR_MIN_RESP_BYTES + record_data.len());
    payload.push(completion_code);
    payload.extend_from_slice(&next_record_handle.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // nextDataTransferHandle
    payload.push(TransferFlag::StartAndEnd as u8);
    payload.extend_from_slice(&(record_data.len() as u16).to_le_bytes());
    payload.extend_from_slice(record_data);
    build_response(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_GET_PDR,
        &payload,
    )
}

/// Decoded GetPDR response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPdrResponse {
    pub completion_code: u8,
    pub next_record_handle: u32,
    pub next_data_transfer_handle: u32,
    pub transfer_flag: u8,
    pub record_data: Vec<u8>,
}

/// Decode a GetPDR response payload.
pub fn decode_get_pdr_resp(payload: &[u8]) -> Result<GetPdrResponse> {
    if payload.is_empty() {
        return Err(Error::DecodeFailed("empty GetPDR response"));
    }
    let completion_code = payload[0];
    if completion_code != ccode::SUCCESS {
        return Ok(GetPdrResponse {
            completion_code,
            next_record_handle: 0,
            next_data_transfer_handle: 0,
            transfer_flag: 0,
            record_data: Vec::new(),
        });
    }
    if payload.len() < GET_PDR_MIN_RESP_BYTES {
        return Err(Error::DecodeFailed("GetPDR response too short"));
    }
    let response_count = u16::from_le_bytes([payload[10], payload[11]]) as usize;
    if payload.len() < GET_PDR_MIN_RESP_BYTES + response_count {
        return Err(Error::DecodeFailed("GetPDR record data truncated"));
    }
    Ok(GetPdrResponse {
        completion_code,
        next_record_handle: u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
        next_data_transfer_handle: u32::from_le_bytes([
            payload[5], payload[6], payload[7], payload[8],
        ]),
        transfer_flag: payload[9],
        record_data: payload[GET_PDR_MIN_RESP_BYTES..GET_PDR_MIN_RESP_BYTES + response_count]
            .to_vec(),
    })
}

// ============================================================================
// SET STATE EFFECTER STATES (0x39)
// ============================================================================

/// Per-offset field of a setStateEffecterStates request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEffecterField {
    /// 0 = noChange, 1 = requestSet.
    pub set_request: u8,
    pub effecter_state: u8,
}

/// Decode a setStateEffecterStates request payload.
pub fn decode_set_state_effecter_states_req(
    payload: &[u8],
) -> Result<(u16, Vec<StateEffecterField>)> {
    // effecterId + count + at least one field
    if payload.len() < 5 {
        return Err(Error::InvalidLength);
    }
    let effecter_id = u16::from_le_bytes([payload[0], payload[1]]);
    let count = payload[2] as usize;
    if count == 0 || count > MAX_COMPOSITE_EFFECTER_COUNT {
        return Err(Error::InvalidData(format!(
            "composite effecter count {} out of range",
            count
        )));
    }
    if payload.len() != 3 + 2 * count {
        return Err(Error::InvalidLength);
    }
    let fields = payload[3..]
        .chunks_exact(2)
        .map(|pair| StateEffecterField {
            set_request: pair[0],
            effecter_state: pair[1],
        })
        .collect();
    Ok((effecter_id, fields))
}

/// Encode a setStateEffecterStates request (full message).
#[must_use]
pub fn encode_set_state_effecter_states_req(
    instance_id: u8,
    effecter_id: u16,
    fields: &[StateEffecterField],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(3 + 2 * fields.len());
    payload.extend_from_slice(&effecter_id.to_le_bytes());
    payload.push(fields.len() as u8);
    for field in fields {
        payload.push(field.set_request);
        payload.push(field.effecter_state);
    }
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_SET_STATE_EFFECTER_STATES,
        &payload,
    )
}

// ============================================================================
// SET NUMERIC EFFECTER VALUE (0x31)
// ============================================================================

/// Decode a setNumericEffecterValue request payload.
///
/// Returns `(effecter_id, data_size, value)` with the value zero-extended.
pub fn decode_set_numeric_effecter_value_req(payload: &[u8]) -> Result<(u16, SensorDataSize, u32)> {
    // effecterId + dataSize + at least one value byte
    if payload.len() < 4 {
        return Err(Error::InvalidLength);
    }
    let effecter_id = u16::from_le_bytes([payload[0], payload[1]]);
    let data_size = SensorDataSize::try_from(payload[2])?;
    if payload.len() != 3 + data_size.byte_len() {
        return Err(Error::InvalidLength);
    }
    let value = read_reading(data_size, &payload[3..])?;
    Ok((effecter_id, data_size, value))
}

/// Encode a setNumericEffecterValue request (full message).
#[must_use]
pub fn encode_set_numeric_effecter_value_req(
    instance_id: u8,
    effecter_id: u16,
    data_size: SensorDataSize,
    value: u32,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(3 + data_size.byte_len());
    payload.extend_from_slice(&effecter_id.to_le_bytes());
    payload.push(data_size as u8);
    payload.extend_from_slice(&value.to_le_bytes()[..data_size.byte_len()]);
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_SET_NUMERIC_EFFECTER_VALUE,
        &payload,
    )
}

// ============================================================================
// GET STATE SENSOR READINGS (0x21)
// ============================================================================

/// Per-offset field of a getStateSensorReadings response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStateField {
    pub sensor_op_state: u8,
    pub present_state: u8,
    pub previous_state: u8,
    pub event_state: u8,
}

/// Decode a getStateSensorReadings request payload.
///
/// Returns `(sensor_id, rearm_bitfield)`. The reserved byte is ignored.
pub fn decode_get_state_sensor_readings_req(payload: &[u8]) -> Result<(u16, u8)> {
    if payload.len() != GET_STATE_SENSOR_READINGS_REQ_BYTES {
        return Err(Error::InvalidLength);
    }
    Ok((u16::from_le_bytes([payload[0], payload[1]]), payload[2]))
}

/// Encode a getStateSensorReadings request (full message).
#[must_use]
pub fn encode_get_state_sensor_readings_req(
    instance_id: u8,
    sensor_id: u16,
    sensor_rearm: u8,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(GET_STATE_SENSOR_READINGS_REQ_BYTES);
    payload.extend_from_slice(&sensor_id.to_le_bytes());
    payload.push(sensor_rearm);
    payload.push(0); // reserved
    build_request(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_GET_STATE_SENSOR_READINGS,
        &payload,
    )
}

/// Encode a getStateSensorReadings response (full message).
#[must_use]
pub fn encode_get_state_sensor_readings_resp(
    instance_id: u8,
    completion_code: u8,
    fields: &[SensorStateField],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + 4 * fields.len());
    payload.push(completion_code);
    payload.push(fields.len() as u8);
    for field in fields {
        payload.push(field.sensor_op_state);
        payload.push(field.present_state);
        payload.push(field.previous_state);
        payload.push(field.event_state);
    }
    build_response(
        instance_id,
        super::PLDM_TYPE_PLATFORM,
        CMD_GET_STATE_SENSOR_READINGS,
        &payload,
    )
}
