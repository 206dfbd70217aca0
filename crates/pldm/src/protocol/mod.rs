// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PLDM wire protocol layer.
//!
//! Byte-exact encode/decode of the PLDM message header and the platform
//! monitoring & control command set (DSP0240 / DSP0248). All multi-byte
//! fields are little-endian on the wire; every decoder length-checks before
//! touching the buffer.

/// Platform command codecs (GetPDR, event messages, effecters, sensors).
pub mod platform;

/// CRC-32/ISO-HDLC for multi-part event data integrity.
pub mod crc;

use crate::error::{Error, Result};

/// MCTP message type carrying PLDM.
pub const MCTP_MSG_TYPE_PLDM: u8 = 1;

/// PLDM message header length in bytes.
pub const PLDM_HEADER_LEN: usize = 3;

/// PLDM header version encoded in every message.
pub const PLDM_HEADER_VERSION: u8 = 0;

/// Highest instance id a requester may allocate (5-bit field).
pub const PLDM_INSTANCE_ID_MAX: u8 = 31;

/// PLDM message type: platform monitoring and control (DSP0248).
pub const PLDM_TYPE_PLATFORM: u8 = 0x02;

/// PLDM message type: BIOS control and configuration (DSP0247).
pub const PLDM_TYPE_BIOS: u8 = 0x03;

/// Completion codes (DSP0240 base set + DSP0248 platform extensions).
pub mod ccode {
    pub const SUCCESS: u8 = 0x00;
    pub const ERROR: u8 = 0x01;
    pub const ERROR_INVALID_DATA: u8 = 0x02;
    pub const ERROR_INVALID_LENGTH: u8 = 0x03;
    pub const ERROR_NOT_READY: u8 = 0x04;
    pub const ERROR_UNSUPPORTED_PLDM_CMD: u8 = 0x05;
    pub const ERROR_INVALID_PLDM_TYPE: u8 = 0x20;

    // Platform-specific (DSP0248 Table 15)
    pub const PLATFORM_INVALID_DATA_TRANSFER_HANDLE: u8 = 0x80;
    pub const PLATFORM_INVALID_TRANSFER_OPERATION_FLAG: u8 = 0x81;
    pub const PLATFORM_INVALID_RECORD_HANDLE: u8 = 0x82;
    pub const PLATFORM_INVALID_RECORD_CHANGE_NUMBER: u8 = 0x83;
    pub const PLATFORM_TRANSFER_TIMEOUT: u8 = 0x84;
}

/// Multi-part transfer delimiter flag (DSP0240 Section 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferFlag {
    Start = 0x01,
    Middle = 0x02,
    End = 0x04,
    StartAndEnd = 0x05,
}

impl TryFrom<u8> for TransferFlag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(TransferFlag::Start),
            0x02 => Ok(TransferFlag::Middle),
            0x04 => Ok(TransferFlag::End),
            0x05 => Ok(TransferFlag::StartAndEnd),
            other => Err(Error::InvalidData(format!(
                "unknown transfer flag {:#04x}",
                other
            ))),
        }
    }
}

/// Transfer operation flag for pull-model commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransferOperation {
    GetNextPart = 0x00,
    #[default]
    GetFirstPart = 0x01,
    /// Close the transfer without requesting more data
    /// (pollForPlatformEventMessage only).
    AcknowledgementOnly = 0x02,
}

impl TryFrom<u8> for TransferOperation {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(TransferOperation::GetNextPart),
            0x01 => Ok(TransferOperation::GetFirstPart),
            0x02 => Ok(TransferOperation::AcknowledgementOnly),
            other => Err(Error::InvalidData(format!(
                "unknown transfer operation {:#04x}",
                other
            ))),
        }
    }
}

/// Decoded PLDM message header.
///
/// # Wire Format
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |R|D|r| inst id | ver |   type    |   command     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `R` = request bit, `D` = datagram bit, `r` = reserved (zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub request: bool,
    pub datagram: bool,
    pub instance_id: u8,
    pub pldm_type: u8,
    pub command: u8,
}

impl MessageHeader {
    /// Header for an outgoing request.
    #[must_use]
    pub fn request(instance_id: u8, pldm_type: u8, command: u8) -> Self {
        Self {
            request: true,
            datagram: false,
            instance_id,
            pldm_type,
            command,
        }
    }

    /// Header for a response, echoing the request's instance id.
    #[must_use]
    pub fn response(instance_id: u8, pldm_type: u8, command: u8) -> Self {
        Self {
            request: false,
            datagram: false,
            instance_id,
            pldm_type,
            command,
        }
    }

    /// Encode into the 3-byte wire header.
    #[must_use]
    pub fn pack(&self) -> [u8; PLDM_HEADER_LEN] {
        let mut hdr = [0u8; PLDM_HEADER_LEN];
        hdr[0] = (u8::from(self.request) << 7)
            | (u8::from(self.datagram) << 6)
            | (self.instance_id & 0x1f);
        hdr[1] = (PLDM_HEADER_VERSION << 6) | (self.pldm_type & 0x3f);
        hdr[2] = self.command;
        hdr
    }

    /// Decode the wire header from the front of `msg`.
    pub fn unpack(msg: &[u8]) -> Result<Self> {
        if msg.len() < PLDM_HEADER_LEN {
            return Err(Error::DecodeFailed("message shorter than PLDM header"));
        }
        Ok(Self {
            request: msg[0] & 0x80 != 0,
            datagram: msg[0] & 0x40 != 0,
            instance_id: msg[0] & 0x1f,
            pldm_type: msg[1] & 0x3f,
            command: msg[2],
        })
    }
}

/// Build a full message (header + payload) for an outgoing request.
#[must_use]
pub fn build_request(instance_id: u8, pldm_type: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(PLDM_HEADER_LEN + payload.len());
    msg.extend_from_slice(&MessageHeader::request(instance_id, pldm_type, command).pack());
    msg.extend_from_slice(payload);
    msg
}

/// Build a full message (header + payload) for a response.
#[must_use]
pub fn build_response(instance_id: u8, pldm_type: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(PLDM_HEADER_LEN + payload.len());
    msg.extend_from_slice(&MessageHeader::response(instance_id, pldm_type, command).pack());
    msg.extend_from_slice(payload);
    msg
}

/// Split a message into its decoded header and payload bytes.
pub fn split_message(msg: &[u8]) -> Result<(MessageHeader, &[u8])> {
    let hdr = MessageHeader::unpack(msg)?;
    Ok((hdr, &msg[PLDM_HEADER_LEN..]))
}
