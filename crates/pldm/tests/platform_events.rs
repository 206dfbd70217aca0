// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::similar_names)] // Test variable naming

//! Platform event dispatcher integration tests.
//!
//! Exercises the responder's event tree end to end:
//! - sensor events (signal emission, host PDR validation, fallback TID)
//! - message-poll events feeding the poller's critical queue
//! - repository-change events (added/modified accumulation, full refresh,
//!   rejected format)
//! - GetPDR with an unknown record handle

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pldm::bus::{FakeBus, RecordedSignal, SignalSink};
use pldm::config::{Tunables, TID_RESERVED};
use pldm::platform::Handler;
use pldm::poller::EventPoller;
use pldm::protocol::platform::{
    encode_get_pdr_req, encode_platform_event_message_req, encode_repository_chg_event_data,
    ChangeRecord, GetPdrRequest, MessagePollEventData, EVENT_CLASS_MESSAGE_POLL,
    EVENT_CLASS_PDR_REPOSITORY_CHG, EVENT_CLASS_SENSOR, FORMAT_IS_PDR_TYPES,
    FORMAT_IS_PDR_HANDLES, RECORDS_ADDED, RECORDS_MODIFIED, REFRESH_ENTIRE_REPOSITORY,
    SENSOR_EVENT_STATE_SENSOR_STATE,
};
use pldm::protocol::platform::encode_message_poll_event_data;
use pldm::protocol::{ccode, split_message, TransferOperation};

/// Signal sink sharing its record list with the test body.
#[derive(Default)]
struct SharedSignals(Arc<Mutex<Vec<RecordedSignal>>>);

impl SignalSink for SharedSignals {
    fn state_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        sensor_offset: u8,
        event_state: u8,
        previous_event_state: u8,
    ) {
        self.0.lock().unwrap().push(RecordedSignal::StateSensor {
            tid,
            sensor_id,
            sensor_offset,
            event_state,
            previous_event_state,
        });
    }

    fn numeric_sensor_event(
        &mut self,
        tid: u8,
        sensor_id: u16,
        event_state: u8,
        previous_event_state: u8,
        sensor_data_size: u8,
        present_reading: u32,
    ) {
        self.0.lock().unwrap().push(RecordedSignal::NumericSensor {
            tid,
            sensor_id,
            event_state,
            previous_event_state,
            sensor_data_size,
            present_reading,
        });
    }

    fn message_poll_event(
        &mut self,
        tid: u8,
        format_version: u8,
        event_id: u16,
        data_transfer_handle: u32,
    ) {
        self.0.lock().unwrap().push(RecordedSignal::MessagePoll {
            tid,
            format_version,
            event_id,
            data_transfer_handle,
        });
    }
}

fn handler() -> (Handler, Arc<Mutex<Vec<RecordedSignal>>>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let signals = Arc::new(Mutex::new(Vec::new()));
    let handler = Handler::new(
        dir.path(),
        Tunables::new(),
        Box::new(SharedSignals(signals.clone())),
        Box::new(FakeBus::new()),
    );
    (handler, signals, dir)
}

fn state_sensor_record(terminus_handle: u16, sensor_id: u16) -> Vec<u8> {
    pldm::pdr::types::StateSensorPdr {
        terminus_handle,
        sensor_id,
        entity_type: 64,
        entity_instance: 1,
        container_id: 0,
        sensor_init: 0,
        sensor_auxiliary_names: false,
        composite: vec![pldm::pdr::types::PossibleStates::from_states(260, &[0, 1, 2])],
    }
    .pack()
}

fn sensor_event_msg(tid: u8, sensor_id: u16, offset: u8, state: u8, prev: u8) -> Vec<u8> {
    let mut event_data = sensor_id.to_le_bytes().to_vec();
    event_data.push(SENSOR_EVENT_STATE_SENSOR_STATE);
    event_data.extend_from_slice(&[offset, state, prev]);
    encode_platform_event_message_req(0, 1, tid, EVENT_CLASS_SENSOR, &event_data)
}

fn response_cc(resp: &[u8]) -> u8 {
    let (_, payload) = split_message(resp).unwrap();
    payload[0]
}

#[test]
fn state_sensor_event_emits_signal_and_invokes_host_handler() {
    let (mut handler, signals, _dir) = handler();

    let states: BTreeSet<u8> = [0u8, 1, 2].into_iter().collect();
    handler
        .host_mut()
        .add_sensor_info((7, 0x10), (1, 64, 2), vec![states]);

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    handler
        .host_mut()
        .set_state_sensor_handler(Box::new(move |entry, state| {
            sink.lock().unwrap().push((entry, state));
            Ok(())
        }));

    let resp = handler
        .handle_request(&sensor_event_msg(7, 0x10, 0, 2, 0))
        .unwrap();
    assert_eq!(response_cc(&resp), ccode::SUCCESS);

    let signals = signals.lock().unwrap();
    assert_eq!(signals.len(), 1);
    assert!(matches!(
        signals[0],
        RecordedSignal::StateSensor {
            tid: 7,
            sensor_id: 0x10,
            sensor_offset: 0,
            event_state: 2,
            previous_event_state: 0,
        }
    ));

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let (entry, state) = delivered[0];
    assert_eq!(
        (entry.container_id, entry.entity_type, entry.entity_instance),
        (1, 64, 2)
    );
    assert_eq!(entry.sensor_offset, 0);
    assert_eq!(state, 2);
}

#[test]
fn state_sensor_event_falls_back_to_reserved_tid() {
    let (mut handler, _signals, _dir) = handler();

    let states: BTreeSet<u8> = [0u8, 1].into_iter().collect();
    handler
        .host_mut()
        .add_sensor_info((TID_RESERVED, 0x20), (0, 64, 1), vec![states]);

    let hits = Arc::new(Mutex::new(0u32));
    let hits2 = hits.clone();
    handler
        .host_mut()
        .set_state_sensor_handler(Box::new(move |_, _| {
            *hits2.lock().unwrap() += 1;
            Ok(())
        }));

    // tid 9 has no exact mapping; the reserved-TID entry serves it
    let resp = handler
        .handle_request(&sensor_event_msg(9, 0x20, 0, 1, 0))
        .unwrap();
    assert_eq!(response_cc(&resp), ccode::SUCCESS);
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[test]
fn state_sensor_event_offset_out_of_range_rejected() {
    let (mut handler, _signals, _dir) = handler();

    let states: BTreeSet<u8> = [0u8, 1].into_iter().collect();
    handler
        .host_mut()
        .add_sensor_info((7, 0x10), (1, 64, 2), vec![states]);

    // offset 3 with a single composite slot
    let resp = handler
        .handle_request(&sensor_event_msg(7, 0x10, 3, 1, 0))
        .unwrap();
    assert_eq!(response_cc(&resp), ccode::ERROR_INVALID_DATA);

    // event state 9 is not among the possible states
    let resp = handler
        .handle_request(&sensor_event_msg(7, 0x10, 0, 9, 0))
        .unwrap();
    assert_eq!(response_cc(&resp), ccode::ERROR_INVALID_DATA);
}

#[test]
fn message_poll_event_feeds_poller_queue() {
    let (mut handler, signals, _dir) = handler();

    let event_data = encode_message_poll_event_data(&MessagePollEventData {
        format_version: 1,
        event_id: 0x0077,
        data_transfer_handle: 0,
    });
    let msg = encode_platform_event_message_req(0, 1, 7, EVENT_CLASS_MESSAGE_POLL, &event_data);
    let resp = handler.handle_request(&msg).unwrap();
    assert_eq!(response_cc(&resp), ccode::SUCCESS);

    // the poller observes the emitted signal and queues the event id
    let mut poller = EventPoller::new(20, Tunables::new(), Instant::now());
    for signal in signals.lock().unwrap().iter() {
        if let RecordedSignal::MessagePoll { event_id, .. } = signal {
            poller.enqueue_critical(*event_id).unwrap();
        }
    }
    assert!(matches!(
        poller.enqueue_critical(0x0077),
        Err(pldm::Error::Duplicate)
    ));
}

#[test]
fn repository_change_added_and_modified_accumulate_handles() {
    let (mut handler, _signals, _dir) = handler();

    let event_data = encode_repository_chg_event_data(
        FORMAT_IS_PDR_HANDLES,
        &[
            ChangeRecord {
                operation: RECORDS_ADDED,
                handles: vec![1, 2],
            },
            ChangeRecord {
                operation: RECORDS_MODIFIED,
                handles: vec![7],
            },
        ],
    );
    let msg =
        encode_platform_event_message_req(0, 1, 7, EVENT_CLASS_PDR_REPOSITORY_CHG, &event_data);
    let resp = handler.handle_request(&msg).unwrap();
    assert_eq!(response_cc(&resp), ccode::SUCCESS);

    assert!(handler.host().is_modified);
    let plan = handler.host_mut().take_fetch_plan();
    assert_eq!(plan.handles, vec![1, 2, 7]);
    assert!(!plan.full);
}

#[test]
fn repository_refresh_removes_terminus_records_and_schedules_refetch() {
    let (mut handler, _signals, _dir) = handler();

    // records bound to TID 7 through terminus handles 10 and 11; TID 9
    // owns terminus handle 12
    let h7a = handler.repo_mut().add(state_sensor_record(10, 0x10)).unwrap();
    let h7b = handler.repo_mut().add(state_sensor_record(11, 0x11)).unwrap();
    let h9 = handler.repo_mut().add(state_sensor_record(12, 0x12)).unwrap();
    handler.host_mut().record_tl_info(10, 7, 20, 1);
    handler.host_mut().record_tl_info(11, 7, 21, 1);
    handler.host_mut().record_tl_info(12, 9, 22, 1);

    let event_data = encode_repository_chg_event_data(REFRESH_ENTIRE_REPOSITORY, &[]);
    let msg =
        encode_platform_event_message_req(0, 1, 7, EVENT_CLASS_PDR_REPOSITORY_CHG, &event_data);
    let resp = handler.handle_request(&msg).unwrap();
    assert_eq!(response_cc(&resp), ccode::SUCCESS);

    // all TID-7 records are gone, the TID-9 record survives
    assert!(handler.repo().get_by_handle(h7a).is_none());
    assert!(handler.repo().get_by_handle(h7b).is_none());
    assert!(handler.repo().get_by_handle(h9).is_some());
    assert!(handler.host().terminus_handles_for_tid(7).is_empty());

    // a fresh fetch is scheduled
    let plan = handler.host_mut().take_fetch_plan();
    assert!(plan.full);
}

#[test]
fn repository_change_by_pdr_type_rejected() {
    let (mut handler, _signals, _dir) = handler();

    let event_data = encode_repository_chg_event_data(FORMAT_IS_PDR_TYPES, &[]);
    let msg =
        encode_platform_event_message_req(0, 1, 7, EVENT_CLASS_PDR_REPOSITORY_CHG, &event_data);
    let resp = handler.handle_request(&msg).unwrap();
    assert_eq!(response_cc(&resp), ccode::ERROR_INVALID_DATA);
}

#[test]
fn get_pdr_unknown_handle_returns_invalid_record_handle() {
    let (mut handler, _signals, _dir) = handler();

    let msg = encode_get_pdr_req(
        1,
        &GetPdrRequest {
            record_handle: 0xffff,
            data_transfer_handle: 0,
            transfer_operation: TransferOperation::GetFirstPart,
            request_count: 128,
            record_change_number: 0,
        },
    );
    let resp = handler.handle_request(&msg).unwrap();
    let (hdr, payload) = split_message(&resp).unwrap();
    // completion code only, no payload beyond the header
    assert_eq!(payload, &[ccode::PLATFORM_INVALID_RECORD_HANDLE]);
    assert_eq!(hdr.instance_id, 1);
}
