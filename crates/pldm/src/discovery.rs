// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MCTP endpoint discovery handling.
//!
//! The MCTP control daemon announces endpoints over the object bus; the
//! core consumes added/removed notifications, keeps only endpoints that
//! speak PLDM (message type 1), and owns the per-endpoint poller lifecycle.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::Tunables;
use crate::poller::EventPoller;
use crate::protocol::MCTP_MSG_TYPE_PLDM;
use crate::requester::RequestHandler;
use crate::transport::{Eid, Transport};

/// Tracks discovered PLDM termini and their pollers.
pub struct MctpDiscovery {
    tunables: Tunables,
    pollers: HashMap<Eid, EventPoller>,
}

impl MctpDiscovery {
    #[must_use]
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            pollers: HashMap::new(),
        }
    }

    /// Handle an endpoint-added notification.
    ///
    /// Endpoints that do not list PLDM among their supported message types
    /// are ignored, as are duplicates. Returns true when a poller was
    /// created.
    pub fn endpoint_added(&mut self, eid: Eid, supported_types: &[u8], now: Instant) -> bool {
        if !supported_types.contains(&MCTP_MSG_TYPE_PLDM) {
            return false;
        }
        if self.pollers.contains_key(&eid) {
            log::debug!("[MctpDiscovery::endpoint_added] duplicate endpoint, EID={}", eid);
            return false;
        }
        log::info!("[MctpDiscovery::endpoint_added] PLDM endpoint discovered, EID={}", eid);
        self.pollers
            .insert(eid, EventPoller::new(eid, self.tunables, now));
        true
    }

    /// Handle an endpoint-removed notification, tearing down the endpoint's
    /// poller and any outstanding requests. Returns true when state existed.
    pub fn endpoint_removed(&mut self, eid: Eid, requester: &mut RequestHandler) -> bool {
        let Some(mut poller) = self.pollers.remove(&eid) else {
            return false;
        };
        log::info!("[MctpDiscovery::endpoint_removed] endpoint departed, EID={}", eid);
        poller.stop();
        poller.reset(requester);
        requester.remove_endpoint(eid);
        true
    }

    /// Access the poller of a discovered endpoint.
    pub fn poller_mut(&mut self, eid: Eid) -> Option<&mut EventPoller> {
        self.pollers.get_mut(&eid)
    }

    /// Discovered endpoint ids.
    #[must_use]
    pub fn eids(&self) -> Vec<Eid> {
        self.pollers.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    /// Pump every endpoint's poller and sweep the correlator.
    ///
    /// The sweep reclaims instance ids of requests whose response deadline
    /// passed without a delivery, so non-poller requesters are covered too;
    /// an expired poller request is additionally cleared by the poller's
    /// own timeout via `reset()` (id release is idempotent).
    pub fn poll_all(
        &mut self,
        now: Instant,
        requester: &mut RequestHandler,
        transport: &mut dyn Transport,
    ) {
        requester.check_timeouts(now);
        for poller in self.pollers.values_mut() {
            poller.poll(now, requester, transport);
        }
    }
}
