// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::similar_names)] // Test variable naming

//! Event poller transfer integration tests.
//!
//! Drives a poller against a scripted terminus through the real correlator
//! and a recording transport:
//! - single-part transfer (START_AND_END) with acknowledgement
//! - two-part reassembly with a correct and a corrupted CRC-32
//! - critical-queue preemption deferring until the transfer completes
//! - duplicate critical enqueue rejection

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pldm::config::Tunables;
use pldm::poller::{EventPoller, PollerState};
use pldm::protocol::crc::crc32;
use pldm::protocol::platform::{
    decode_poll_for_event_req, encode_poll_for_event_resp, PollForEventResponse, EVENT_ID_NONE,
};
use pldm::protocol::{ccode, split_message, TransferFlag, TransferOperation};
use pldm::requester::RequestHandler;
use pldm::transport::RecordingTransport;
use pldm::Error;

const EID: u8 = 20;
const TID: u8 = 2;

/// Completed events delivered to the class handler.
type Delivered = Arc<Mutex<Vec<(u8, u8, u16, Vec<u8>)>>>;

struct Rig {
    poller: EventPoller,
    requester: RequestHandler,
    transport: RecordingTransport,
    delivered: Delivered,
    now: Instant,
    tunables: Tunables,
}

fn test_tunables() -> Tunables {
    let mut t = Tunables::new();
    t.normal_event_period = Duration::from_millis(1_000);
    t.critical_event_period = Duration::from_millis(300);
    t.poll_request_delay = Duration::from_millis(10);
    // keep the poll timeout comfortably beyond the critical period so a
    // deliberately-stalled transfer is not reset mid-test
    t.response_timeout = Duration::from_millis(500);
    t.request_retries = 2;
    t
}

impl Rig {
    fn new() -> Self {
        let tunables = test_tunables();
        let now = Instant::now();
        let mut poller = EventPoller::new(EID, tunables, now);

        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        poller.register_event_handler(
            5,
            Box::new(move |tid, class, event_id, data| {
                sink.lock().unwrap().push((tid, class, event_id, data.to_vec()));
            }),
        );

        Self {
            poller,
            requester: RequestHandler::new(tunables.poll_timeout()),
            transport: RecordingTransport::new(),
            delivered,
            now,
            tunables,
        }
    }

    fn advance(&mut self, by: Duration) {
        self.now += by;
        self.poller
            .poll(self.now, &mut self.requester, &mut self.transport);
    }

    /// Step past the normal timer and the request delay so a probe goes out.
    fn run_normal_probe(&mut self) {
        self.advance(self.tunables.normal_event_period + Duration::from_millis(1));
        self.advance(self.tunables.poll_request_delay + Duration::from_millis(1));
        assert_eq!(self.poller.state(), PollerState::Polling);
    }

    /// Step past the critical timer and the request delay.
    fn run_critical_cycle(&mut self) {
        self.advance(self.tunables.critical_event_period + Duration::from_millis(1));
        self.advance(self.tunables.poll_request_delay + Duration::from_millis(1));
    }

    /// Last request the poller transmitted, decoded.
    fn last_request(&self) -> (u8, pldm::protocol::platform::PollForEventRequest) {
        let (eid, msg) = self.transport.last_sent().expect("a request was sent");
        assert_eq!(*eid, EID);
        let (hdr, payload) = split_message(msg).unwrap();
        (hdr.instance_id, decode_poll_for_event_req(payload).unwrap())
    }

    /// Answer the outstanding request and pump the poller twice (drain the
    /// response, then let the follow-up request fire).
    fn respond(&mut self, resp: &PollForEventResponse) {
        let (iid, _) = self.last_request();
        let msg = encode_poll_for_event_resp(iid, resp);
        self.requester.handle_response(EID, &msg).unwrap();
        self.advance(Duration::from_millis(1));
        self.advance(self.tunables.poll_request_delay + Duration::from_millis(1));
    }

    fn respond_sentinel(&mut self) {
        self.respond(&PollForEventResponse {
            completion_code: ccode::SUCCESS,
            tid: TID,
            event_id: EVENT_ID_NONE,
            ..PollForEventResponse::default()
        });
    }
}

fn part(event_id: u16, flag: TransferFlag, next_handle: u32, data: &[u8]) -> PollForEventResponse {
    PollForEventResponse {
        completion_code: ccode::SUCCESS,
        tid: TID,
        event_id,
        next_data_transfer_handle: next_handle,
        transfer_flag: flag as u8,
        event_class: 5,
        event_data: data.to_vec(),
        checksum: 0,
    }
}

#[test]
fn single_part_event_delivers_and_acknowledges() {
    let mut rig = Rig::new();
    rig.run_normal_probe();

    rig.respond(&part(0x0042, TransferFlag::StartAndEnd, 0, &[0x01, 0x02, 0x03]));

    // handler 5 saw the payload
    let delivered = rig.delivered.lock().unwrap().clone();
    assert_eq!(delivered, vec![(TID, 5, 0x0042, vec![0x01, 0x02, 0x03])]);

    // an AcknowledgementOnly follow-up went out for the event id
    let (_, ack) = rig.last_request();
    assert_eq!(ack.operation, TransferOperation::AcknowledgementOnly);
    assert_eq!(ack.event_id_to_ack, 0x0042);
    assert_eq!(ack.data_transfer_handle, 0);

    // terminus closes the cycle; state returns to Idle
    rig.respond_sentinel();
    assert_eq!(rig.poller.state(), PollerState::Idle);
}

#[test]
fn two_part_event_reassembles_with_valid_crc() {
    let mut rig = Rig::new();
    rig.run_normal_probe();

    // part 1: START, payload [AA BB], cursor for the next part is 2
    rig.respond(&part(0x0042, TransferFlag::Start, 2, &[0xaa, 0xbb]));
    assert_eq!(rig.poller.state(), PollerState::Polling);

    let (_, next) = rig.last_request();
    assert_eq!(next.operation, TransferOperation::GetNextPart);
    assert_eq!(next.data_transfer_handle, 2);
    assert_eq!(next.event_id_to_ack, 0x0042);

    // part 2: END, payload [CC DD], checksum over the full event data
    let mut end = part(0x0042, TransferFlag::End, 0, &[0xcc, 0xdd]);
    end.checksum = crc32(&[0xaa, 0xbb, 0xcc, 0xdd]);
    rig.respond(&end);

    let delivered = rig.delivered.lock().unwrap().clone();
    assert_eq!(delivered, vec![(TID, 5, 0x0042, vec![0xaa, 0xbb, 0xcc, 0xdd])]);

    let (_, ack) = rig.last_request();
    assert_eq!(ack.operation, TransferOperation::AcknowledgementOnly);
    rig.respond_sentinel();
    assert_eq!(rig.poller.state(), PollerState::Idle);
}

#[test]
fn two_part_event_with_bad_crc_is_dropped_but_acknowledged() {
    let mut rig = Rig::new();
    rig.run_normal_probe();

    rig.respond(&part(0x0042, TransferFlag::Start, 2, &[0xaa, 0xbb]));

    let mut end = part(0x0042, TransferFlag::End, 0, &[0xcc, 0xdd]);
    end.checksum = crc32(&[0xaa, 0xbb, 0xcc, 0xdd]) ^ 0xffff_ffff; // corrupted
    rig.respond(&end);

    // handler was NOT invoked
    assert!(rig.delivered.lock().unwrap().is_empty());

    // the acknowledgement still goes out so the terminus advances
    let (_, ack) = rig.last_request();
    assert_eq!(ack.operation, TransferOperation::AcknowledgementOnly);
    assert_eq!(ack.event_id_to_ack, 0x0042);

    rig.respond_sentinel();
    assert_eq!(rig.poller.state(), PollerState::Idle);
}

#[test]
fn critical_defers_until_transfer_completes() {
    let mut rig = Rig::new();
    rig.run_normal_probe();

    // normal probe starts a multi-part transfer
    rig.respond(&part(0x0042, TransferFlag::Start, 2, &[0xaa, 0xbb]));
    let requests_mid_transfer = rig.transport.sent.len();

    // critical work arrives mid-transfer; its timer fires but must defer
    rig.poller.enqueue_critical(0x0077).unwrap();
    rig.advance(rig.tunables.critical_event_period + Duration::from_millis(1));
    let (_, outstanding) = rig.last_request();
    assert_eq!(outstanding.event_id_to_ack, 0x0042);
    assert_eq!(rig.transport.sent.len(), requests_mid_transfer);

    // finish the transfer: END part, ACK, closing sentinel
    let mut end = part(0x0042, TransferFlag::End, 0, &[0xcc, 0xdd]);
    end.checksum = crc32(&[0xaa, 0xbb, 0xcc, 0xdd]);
    rig.respond(&end);
    rig.respond_sentinel();
    assert_eq!(rig.poller.state(), PollerState::Idle);

    // next critical cycle picks up the queue head
    rig.run_critical_cycle();
    rig.advance(rig.tunables.poll_request_delay + Duration::from_millis(1));
    let (_, critical) = rig.last_request();
    assert_eq!(critical.event_id_to_ack, 0x0077);
    assert_eq!(critical.operation, TransferOperation::GetFirstPart);
}

#[test]
fn duplicate_critical_enqueue_rejected() {
    let mut rig = Rig::new();
    assert!(rig.poller.enqueue_critical(0x1234).is_ok());
    assert!(matches!(
        rig.poller.enqueue_critical(0x1234),
        Err(Error::Duplicate)
    ));
}

#[test]
fn non_contiguous_cursor_aborts_transfer() {
    let mut rig = Rig::new();
    rig.run_normal_probe();

    rig.respond(&part(0x0042, TransferFlag::Start, 7, &[0xaa, 0xbb]));

    // terminus returned cursor 7, but only 2 bytes are accumulated: the
    // MIDDLE insert is non-contiguous and the transfer must be dropped
    rig.respond(&part(0x0042, TransferFlag::Middle, 9, &[0xcc, 0xdd]));
    assert_eq!(rig.poller.state(), PollerState::Idle);
    assert!(rig.delivered.lock().unwrap().is_empty());
}
