// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform event poller.
//!
//! One [`EventPoller`] per endpoint solicits platform events with
//! pollForPlatformEventMessage, reassembles multi-part payloads, validates
//! the trailing CRC-32, and delivers completed events to the registered
//! class handlers. All timers are deadlines pumped by [`EventPoller::poll`];
//! nothing blocks.
//!
//! ```text
//!                     normal timer (probe 0x0000)
//!                  ┌─────────────────────────────┐
//!                  ▼                             │
//!   ┌────────┐ request sent  ┌─────────┐ START/MIDDLE ┌──────────────┐
//!   │  IDLE  │ ─────────────▶│ POLLING │ ────────────▶│ REASSEMBLING │
//!   └────────┘               └─────────┘              └──────────────┘
//!       ▲                         │  ▲   next part request   │
//!       │   END/START_AND_END     │  └──────────────────────-┘
//!       │   (handler + ACK)       │
//!       └─────────────────────────┴── sentinel id / mismatch / decode
//!                                     failure / timeout -> reset()
//! ```
//!
//! The critical timer services [`CriticalEventQueue`] instead of probing,
//! and only between transfers: a transfer under way runs to completion
//! before a critical event may begin.

/// Bounded critical event queue.
pub mod queue;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::Tunables;
use crate::error::Error;
use crate::protocol::crc::crc32;
use crate::protocol::platform::{
    decode_poll_for_event_resp, encode_poll_for_event_req, PollForEventRequest,
    CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE, EVENT_ID_NONE, EVENT_ID_TERMINATE,
};
use crate::protocol::{
    ccode, split_message, TransferFlag, TransferOperation, PLDM_TYPE_PLATFORM,
};
use crate::requester::RequestHandler;
use crate::transport::{Eid, Transport};
use queue::CriticalEventQueue;

/// Handler invoked with a completed event: `(tid, event_class, event_id,
/// event_data)`.
pub type EventCallback = Box<dyn FnMut(u8, u8, u16, &[u8])>;

/// Observable poller state, derived from the transfer flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No transfer in progress.
    Idle,
    /// A poll request is outstanding.
    Polling,
    /// Mid-transfer, between parts.
    Reassembling,
    /// Parked on the terminate sentinel until the next timer tick.
    Terminated,
}

/// Request-side transfer cursor (one per endpoint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RequestState {
    operation: TransferOperation,
    data_transfer_handle: u32,
    event_id_to_ack: u16,
}

/// Reassembly buffer for one event transfer.
#[derive(Debug, Default)]
struct ReceiveBuffer {
    event_class: u8,
    total_size: u32,
    data: Vec<u8>,
}

impl ReceiveBuffer {
    fn clear(&mut self) {
        self.event_class = 0;
        self.total_size = 0;
        self.data.clear();
    }
}

/// Per-endpoint platform event poller.
pub struct EventPoller {
    eid: Eid,
    tunables: Tunables,
    req: RequestState,
    recv: ReceiveBuffer,
    crit_queue: CriticalEventQueue,

    is_process_polling: bool,
    is_polling: bool,
    response_received: bool,
    is_critical: bool,
    instance_id: u8,

    normal_due: Option<Instant>,
    critical_due: Option<Instant>,
    poll_request_due: Option<Instant>,
    poll_timeout_due: Option<Instant>,

    /// Responses delivered by the correlator callback, drained by `poll`.
    inbox: Arc<Mutex<VecDeque<Vec<u8>>>>,
    handlers: HashMap<u8, EventCallback>,
}

impl EventPoller {
    /// Create a poller for `eid` with both periodic timers armed at `now`.
    #[must_use]
    pub fn new(eid: Eid, tunables: Tunables, now: Instant) -> Self {
        Self {
            eid,
            tunables,
            req: RequestState::default(),
            recv: ReceiveBuffer::default(),
            crit_queue: CriticalEventQueue::new(tunables.max_queue_size),
            is_process_polling: false,
            is_polling: false,
            response_received: false,
            is_critical: false,
            instance_id: 0,
            normal_due: Some(now + tunables.normal_event_period),
            critical_due: Some(now + tunables.critical_event_period),
            poll_request_due: None,
            poll_timeout_due: None,
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn eid(&self) -> Eid {
        self.eid
    }

    /// Register the completion handler for `event_class`.
    pub fn register_event_handler(&mut self, event_class: u8, handler: EventCallback) {
        self.handlers.insert(event_class, handler);
    }

    /// Queue a critical event id for the next critical cycle.
    pub fn enqueue_critical(&mut self, event_id: u16) -> crate::error::Result<()> {
        self.crit_queue.enqueue(event_id)
    }

    /// Derived state machine position.
    #[must_use]
    pub fn state(&self) -> PollerState {
        if self.req.event_id_to_ack == EVENT_ID_TERMINATE && !self.is_polling {
            PollerState::Terminated
        } else if self.is_polling {
            PollerState::Polling
        } else if self.is_process_polling {
            PollerState::Reassembling
        } else {
            PollerState::Idle
        }
    }

    /// Disarm the periodic timers (endpoint going away).
    pub fn stop(&mut self) {
        self.normal_due = None;
        self.critical_due = None;
    }

    /// Pump the poller: drain responses, fire due timers, issue requests.
    ///
    /// Call from the event loop whenever a deadline may have passed or a
    /// response has been delivered.
    pub fn poll(
        &mut self,
        now: Instant,
        requester: &mut RequestHandler,
        transport: &mut dyn Transport,
    ) {
        // Responses first: they re-arm the request timer for the next part.
        loop {
            let msg = {
                let mut inbox = match self.inbox.lock() {
                    Ok(lock) => lock,
                    Err(e) => {
                        log::debug!("[EventPoller::poll] inbox lock poisoned, recovering");
                        e.into_inner()
                    }
                };
                inbox.pop_front()
            };
            match msg {
                Some(msg) => self.process_response(now, &msg, requester),
                None => break,
            }
        }

        if let Some(due) = self.poll_timeout_due {
            if now >= due {
                self.poll_timeout_due = None;
                self.handle_poll_timeout(requester);
            }
        }

        if let Some(due) = self.normal_due {
            if now >= due {
                self.normal_due = Some(now + self.tunables.normal_event_period);
                self.normal_event_tick(now);
            }
        }

        if let Some(due) = self.critical_due {
            if now >= due {
                self.critical_due = Some(now + self.tunables.critical_event_period);
                self.critical_event_tick(now);
            }
        }

        if let Some(due) = self.poll_request_due {
            if now >= due {
                self.poll_request_due = None;
                self.issue_poll_request(now, requester, transport);
            }
        }
    }

    /// Normal cycle: probe for whatever event the terminus has next.
    ///
    /// Defers while a transfer is under way or the critical path holds the
    /// endpoint.
    fn normal_event_tick(&mut self, now: Instant) {
        if self.is_process_polling || self.is_critical {
            return;
        }
        self.req = RequestState {
            operation: TransferOperation::GetFirstPart,
            data_transfer_handle: u32::from(EVENT_ID_NONE),
            event_id_to_ack: EVENT_ID_NONE,
        };
        self.poll_request_due = Some(now + self.tunables.poll_request_delay);
    }

    /// Critical cycle: service the queue head. Defers only while a poll is
    /// in flight.
    fn critical_event_tick(&mut self, now: Instant) {
        if self.is_process_polling {
            return;
        }
        let Some(event_id) = self.crit_queue.pop_front() else {
            self.is_critical = false;
            return;
        };
        self.is_critical = true;
        self.req = RequestState {
            operation: TransferOperation::GetFirstPart,
            data_transfer_handle: u32::from(event_id),
            event_id_to_ack: event_id,
        };
        self.poll_request_due = Some(now + self.tunables.poll_request_delay);
    }

    /// Issue the next pollForPlatformEventMessage request of the cycle.
    fn issue_poll_request(
        &mut self,
        now: Instant,
        requester: &mut RequestHandler,
        transport: &mut dyn Transport,
    ) {
        if self.is_polling {
            return;
        }
        if self.req.event_id_to_ack == EVENT_ID_TERMINATE {
            return;
        }

        let iid = match requester.next_instance_id(self.eid) {
            Ok(iid) => iid,
            Err(e) => {
                log::warn!(
                    "[EventPoller::issue_poll_request] dropping cycle, EID={} ERROR={}",
                    self.eid,
                    e
                );
                return;
            }
        };
        let msg = encode_poll_for_event_req(
            iid,
            &PollForEventRequest {
                format_version: 1,
                operation: self.req.operation,
                data_transfer_handle: self.req.data_transfer_handle,
                event_id_to_ack: self.req.event_id_to_ack,
            },
        );

        let inbox = Arc::clone(&self.inbox);
        let result = requester.register_request(
            transport,
            self.eid,
            iid,
            PLDM_TYPE_PLATFORM,
            CMD_POLL_FOR_PLATFORM_EVENT_MESSAGE,
            msg,
            Box::new(move |_eid, response| {
                let mut inbox = match inbox.lock() {
                    Ok(lock) => lock,
                    Err(e) => e.into_inner(),
                };
                inbox.push_back(response.to_vec());
            }),
        );
        if let Err(e) = result {
            log::error!(
                "[EventPoller::issue_poll_request] failed to send poll request, EID={} ERROR={}",
                self.eid,
                e
            );
            requester.free_instance_id(self.eid, iid);
            return;
        }

        self.instance_id = iid;
        self.is_process_polling = true;
        self.is_polling = true;
        self.response_received = false;
        self.poll_timeout_due = Some(now + self.tunables.poll_timeout());
    }

    /// Process one poll response, advancing the transfer cursor.
    fn process_response(&mut self, now: Instant, msg: &[u8], requester: &mut RequestHandler) {
        self.response_received = true;
        self.is_polling = false;
        self.poll_timeout_due = None;

        let resp = match split_message(msg).and_then(|(_, payload)| {
            decode_poll_for_event_resp(payload)
        }) {
            Ok(resp) => resp,
            Err(e) => {
                log::error!(
                    "[EventPoller::process_response] failed to decode poll response, EID={} ERROR={}",
                    self.eid,
                    e
                );
                self.reset(requester);
                return;
            }
        };

        if resp.completion_code != ccode::SUCCESS
            || resp.event_id == EVENT_ID_NONE
            || resp.event_id == EVENT_ID_TERMINATE
        {
            self.reset(requester);
            return;
        }

        // Drop when the response id does not match the id being acknowledged.
        if self.req.event_id_to_ack != EVENT_ID_NONE
            && resp.event_id != self.req.event_id_to_ack
        {
            log::warn!(
                "[EventPoller::process_response] event id mismatch, EID={} RECV={:#06x} QUEUED={:#06x}",
                self.eid,
                resp.event_id,
                self.req.event_id_to_ack
            );
            self.reset(requester);
            return;
        }

        let flag = match TransferFlag::try_from(resp.transfer_flag) {
            Ok(flag) => flag,
            Err(e) => {
                log::error!(
                    "[EventPoller::process_response] bad transfer flag, EID={} ERROR={}",
                    self.eid,
                    e
                );
                self.reset(requester);
                return;
            }
        };

        match flag {
            TransferFlag::Start => {
                if !self.insert_part(0, &resp.event_data, requester) {
                    return;
                }
                self.recv.event_class = resp.event_class;
                self.req = RequestState {
                    operation: TransferOperation::GetNextPart,
                    data_transfer_handle: resp.next_data_transfer_handle,
                    event_id_to_ack: resp.event_id,
                };
            }
            TransferFlag::Middle => {
                // Insert at the previous cursor; a cursor that is not the
                // accumulated length is a protocol error.
                if !self.insert_part(self.req.data_transfer_handle, &resp.event_data, requester) {
                    return;
                }
                self.req = RequestState {
                    operation: TransferOperation::GetNextPart,
                    data_transfer_handle: resp.next_data_transfer_handle,
                    event_id_to_ack: resp.event_id,
                };
            }
            TransferFlag::End | TransferFlag::StartAndEnd => {
                let offset = if flag == TransferFlag::StartAndEnd {
                    0
                } else {
                    self.req.data_transfer_handle
                };
                if !self.insert_part(offset, &resp.event_data, requester) {
                    return;
                }
                self.recv.event_class = resp.event_class;

                // The integrity checksum only covers multi-part transfers;
                // single-part payloads skip validation entirely.
                let event_class = self.recv.event_class;
                let checksum = crc32(&self.recv.data);
                if flag == TransferFlag::End && checksum != resp.checksum {
                    log::error!(
                        "[EventPoller::process_response] {}",
                        Error::ChecksumMismatch {
                            expected: resp.checksum,
                            actual: checksum,
                        }
                    );
                } else if let Some(handler) = self.handlers.get_mut(&event_class) {
                    handler(resp.tid, event_class, resp.event_id, &self.recv.data);
                }
                log::debug!(
                    "[EventPoller::process_response] EVENT_ID={:#06x} DATA_LENGTH={}",
                    resp.event_id,
                    self.recv.total_size
                );

                self.req = RequestState {
                    operation: TransferOperation::AcknowledgementOnly,
                    data_transfer_handle: 0,
                    event_id_to_ack: resp.event_id,
                };
            }
        }

        // Drive the next request (or the closing acknowledgement).
        self.poll_request_due = Some(now + self.tunables.poll_request_delay);
    }

    /// Positional insert of one part. Returns false after resetting on a
    /// non-contiguous cursor.
    fn insert_part(&mut self, offset: u32, part: &[u8], requester: &mut RequestHandler) -> bool {
        if offset as usize != self.recv.data.len() {
            log::error!(
                "[EventPoller::insert_part] non-contiguous transfer handle, EID={} OFFSET={} ACCUMULATED={}",
                self.eid,
                offset,
                self.recv.data.len()
            );
            self.reset(requester);
            return false;
        }
        self.recv.data.extend_from_slice(part);
        self.recv.total_size += part.len() as u32;
        true
    }

    /// Abandon the transfer when the response budget elapsed unanswered.
    fn handle_poll_timeout(&mut self, requester: &mut RequestHandler) {
        if !self.response_received {
            log::warn!(
                "[EventPoller::handle_poll_timeout] dropping event, EID={} EVENT_ID={:#06x}",
                self.eid,
                self.req.event_id_to_ack
            );
            self.reset(requester);
        }
    }

    /// Clear all transfer state and release the instance id.
    ///
    /// `is_critical` is left alone: the critical cycle clears it itself once
    /// its queue drains.
    pub fn reset(&mut self, requester: &mut RequestHandler) {
        self.is_process_polling = false;
        self.is_polling = false;
        self.response_received = false;
        self.req = RequestState::default();
        self.recv.clear();
        requester.free_instance_id(self.eid, self.instance_id);
        self.poll_request_due = None;
        self.poll_timeout_due = None;
    }
}
