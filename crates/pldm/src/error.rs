// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Every fallible operation in the responder and the poller reports through
//! [`Error`]. Command handlers translate errors into completion-code-only
//! responses via [`Error::completion_code`]; poller-internal errors are
//! logged and cleared via `reset()` and never escape the subsystem.

use crate::protocol::ccode;

/// Errors returned by PLDM responder and poller operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Wire / codec errors
    // ========================================================================
    /// Message or payload length does not match the command's fixed layout.
    InvalidLength,
    /// A field value is outside its defined range or violates the format.
    InvalidData(String),
    /// Message bytes could not be decoded (truncated or malformed).
    DecodeFailed(&'static str),
    /// Reassembled event data checksum does not match the trailing CRC-32.
    ChecksumMismatch { expected: u32, actual: u32 },

    // ========================================================================
    // Repository errors
    // ========================================================================
    /// No PDR record exists for the requested record handle.
    InvalidRecordHandle(u32),
    /// The responder cannot service the request yet (host state, FRU build).
    NotReady,

    // ========================================================================
    // Request/response correlation errors
    // ========================================================================
    /// All 32 instance ids on this endpoint are outstanding.
    NoFreeSlot(u8),
    /// A request is already live on this (endpoint, instance id) pair.
    DuplicateRequest { eid: u8, instance_id: u8 },
    /// The transport rejected the outgoing request.
    SendFailed(String),
    /// No response arrived before the retry-scaled response timeout.
    Timeout,

    // ========================================================================
    // Queue / dispatch errors
    // ========================================================================
    /// The event id is already waiting in the critical queue.
    Duplicate,
    /// The critical queue is at capacity.
    Full,
    /// No handler chain is registered for the event class.
    HandlerMissing(u8),

    // ========================================================================
    // Other errors
    // ========================================================================
    /// Filesystem access failed (configuration directories).
    Io(std::io::Error),
    /// Unrecoverable internal inconsistency.
    InternalFailure(String),
}

impl Error {
    /// Map this error onto the PLDM completion code carried by a
    /// cc-only response.
    #[must_use]
    pub fn completion_code(&self) -> u8 {
        match self {
            Error::InvalidLength => ccode::ERROR_INVALID_LENGTH,
            Error::InvalidData(_) | Error::Duplicate | Error::Full | Error::HandlerMissing(_) => {
                ccode::ERROR_INVALID_DATA
            }
            Error::DecodeFailed(_) => ccode::ERROR_INVALID_DATA,
            Error::NotReady => ccode::ERROR_NOT_READY,
            Error::InvalidRecordHandle(_) => ccode::PLATFORM_INVALID_RECORD_HANDLE,
            _ => ccode::ERROR,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Wire / codec
            Error::InvalidLength => write!(f, "Invalid message length"),
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Error::DecodeFailed(what) => write!(f, "Decode failed: {}", what),
            Error::ChecksumMismatch { expected, actual } => write!(
                f,
                "Event data checksum mismatch: expected {:#010x}, computed {:#010x}",
                expected, actual
            ),
            // Repository
            Error::InvalidRecordHandle(handle) => {
                write!(f, "Invalid PDR record handle: {:#x}", handle)
            }
            Error::NotReady => write!(f, "Responder not ready"),
            // Correlation
            Error::NoFreeSlot(eid) => {
                write!(f, "No free instance id on endpoint {}", eid)
            }
            Error::DuplicateRequest { eid, instance_id } => write!(
                f,
                "Request already outstanding on endpoint {} instance id {}",
                eid, instance_id
            ),
            Error::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            Error::Timeout => write!(f, "Response timeout"),
            // Queue / dispatch
            Error::Duplicate => write!(f, "Event id already queued"),
            Error::Full => write!(f, "Critical event queue full"),
            Error::HandlerMissing(class) => {
                write!(f, "No handler registered for event class {:#x}", class)
            }
            // Other
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InternalFailure(msg) => write!(f, "Internal failure: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
