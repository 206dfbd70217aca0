// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MCTP transport seam.
//!
//! The MCTP stack itself is an external collaborator; the core only needs a
//! way to hand a framed PLDM message to an endpoint. Production code plugs
//! in the platform's MCTP socket; tests use [`RecordingTransport`].

use crate::error::{Error, Result};

/// MCTP endpoint identifier.
pub type Eid = u8;

/// Outbound path for PLDM-over-MCTP messages.
pub trait Transport {
    /// Transmit one PLDM message (header + payload) to `eid`.
    fn send(&mut self, eid: Eid, msg: &[u8]) -> Result<()>;
}

/// Transport double that records every sent frame.
///
/// `fail_sends` makes the next sends report [`Error::SendFailed`], which the
/// tests use to drive the early-exit paths.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<(Eid, Vec<u8>)>,
    pub fail_sends: bool,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop recorded frames.
    pub fn clear(&mut self) {
        self.sent.clear();
    }

    /// The most recently sent frame, if any.
    #[must_use]
    pub fn last_sent(&self) -> Option<&(Eid, Vec<u8>)> {
        self.sent.last()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, eid: Eid, msg: &[u8]) -> Result<()> {
        if self.fail_sends {
            return Err(Error::SendFailed("transport unavailable".to_string()));
        }
        self.sent.push((eid, msg.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_transport_captures_frames() {
        let mut transport = RecordingTransport::new();
        transport.send(9, &[1, 2, 3]).unwrap();
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.last_sent().unwrap(), &(9, vec![1, 2, 3]));
    }

    #[test]
    fn test_recording_transport_failure_mode() {
        let mut transport = RecordingTransport::new();
        transport.fail_sends = true;
        assert!(matches!(
            transport.send(9, &[1]),
            Err(Error::SendFailed(_))
        ));
        assert!(transport.sent.is_empty());
    }
}
