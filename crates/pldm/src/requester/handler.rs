// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound request registration and response correlation.
//!
//! A registered request installs a one-shot callback matched on
//! (endpoint, instance id). The callback is removed on delivery — nothing
//! holds it beyond the first response, so a late duplicate is rejected as
//! unmatched. The timeout sweep releases ids whose response never came.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::instance_id::InstanceIdDb;
use crate::error::{Error, Result};
use crate::protocol::MessageHeader;
use crate::transport::{Eid, Transport};

/// One-shot response callback. Receives the endpoint and the full response
/// message (header included).
pub type ResponseCallback = Box<dyn FnOnce(Eid, &[u8])>;

struct PendingRequest {
    pldm_type: u8,
    command: u8,
    deadline: Instant,
    callback: ResponseCallback,
}

/// Correlates outbound requests with their responses per endpoint.
pub struct RequestHandler {
    ids: InstanceIdDb,
    pending: HashMap<(Eid, u8), PendingRequest>,
    timeout: Duration,
}

impl RequestHandler {
    /// `timeout` is the full per-request budget after which the id is
    /// reclaimed (callers typically pass [`crate::config::Tunables::poll_timeout`]).
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            ids: InstanceIdDb::new(),
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Allocate an instance id for the next request on `eid`.
    pub fn next_instance_id(&mut self, eid: Eid) -> Result<u8> {
        self.ids.alloc(eid)
    }

    /// Release an instance id and drop any callback still pending on it.
    ///
    /// Mandatory on response, timeout, and every early-exit path; safe to
    /// call more than once.
    pub fn free_instance_id(&mut self, eid: Eid, iid: u8) {
        self.pending.remove(&(eid, iid));
        self.ids.free(eid, iid);
    }

    /// Transmit `msg` and install `callback` for the response on
    /// (`eid`, `iid`).
    ///
    /// On send failure the callback is NOT installed and the error is
    /// returned; the caller still owns the instance id and must free it.
    pub fn register_request(
        &mut self,
        transport: &mut dyn Transport,
        eid: Eid,
        iid: u8,
        pldm_type: u8,
        command: u8,
        msg: Vec<u8>,
        callback: ResponseCallback,
    ) -> Result<()> {
        if self.pending.contains_key(&(eid, iid)) {
            return Err(Error::DuplicateRequest {
                eid,
                instance_id: iid,
            });
        }
        transport.send(eid, &msg)?;
        self.pending.insert(
            (eid, iid),
            PendingRequest {
                pldm_type,
                command,
                deadline: Instant::now() + self.timeout,
                callback,
            },
        );
        Ok(())
    }

    /// Deliver an inbound response message to its registered callback.
    ///
    /// Unmatched responses (freed id, wrong type/command, request bit set)
    /// are discarded with an error — a response racing its own timeout lands
    /// here and is dropped silently by the caller.
    pub fn handle_response(&mut self, eid: Eid, msg: &[u8]) -> Result<()> {
        let hdr = MessageHeader::unpack(msg)?;
        if hdr.request {
            return Err(Error::InvalidData(
                "response path received a request".to_string(),
            ));
        }
        let key = (eid, hdr.instance_id);
        let matched = match self.pending.get(&key) {
            Some(p) => p.pldm_type == hdr.pldm_type && p.command == hdr.command,
            None => false,
        };
        if !matched {
            log::debug!(
                "[RequestHandler::handle_response] unmatched response, EID={} IID={} CMD={:#04x}",
                eid,
                hdr.instance_id,
                hdr.command
            );
            return Err(Error::InvalidData("unmatched response".to_string()));
        }
        let pending = self
            .pending
            .remove(&key)
            .ok_or_else(|| Error::InternalFailure("pending entry vanished".to_string()))?;
        self.ids.free(eid, hdr.instance_id);
        (pending.callback)(eid, msg);
        Ok(())
    }

    /// Reclaim ids whose response deadline has passed.
    ///
    /// Returns the (endpoint, instance id) pairs that expired; their
    /// callbacks are dropped uninvoked.
    pub fn check_timeouts(&mut self, now: Instant) -> Vec<(Eid, u8)> {
        let expired: Vec<(Eid, u8)> = self
            .pending
            .iter()
            .filter(|(_, p)| now >= p.deadline)
            .map(|(&key, _)| key)
            .collect();
        for &(eid, iid) in &expired {
            log::warn!(
                "[RequestHandler::check_timeouts] request timed out, EID={} IID={}",
                eid,
                iid
            );
            self.free_instance_id(eid, iid);
        }
        expired
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop all state for a departed endpoint.
    pub fn remove_endpoint(&mut self, eid: Eid) {
        self.pending.retain(|&(e, _), _| e != eid);
        self.ids.remove_endpoint(eid);
    }
}
