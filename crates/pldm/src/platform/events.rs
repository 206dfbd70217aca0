// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform event dispatch tree.
//!
//! Each event class carries an ordered chain of handlers; the chain runs
//! sequentially and the first failure aborts it, its error becoming the
//! command's completion code. The built-in chains decode sensor events,
//! message-poll events, and PDR repository-change events.

use super::host::StateSensorEntry;
use super::Handler;
use crate::config::TID_RESERVED;
use crate::error::{Error, Result};
use crate::protocol::platform::{
    decode_message_poll_event_data, decode_numeric_sensor_data, decode_repository_chg_event_data,
    decode_sensor_event_data, decode_state_sensor_data, parse_change_records,
    FORMAT_IS_PDR_HANDLES, FORMAT_IS_PDR_TYPES, RECORDS_ADDED, RECORDS_MODIFIED,
    REFRESH_ENTIRE_REPOSITORY, SENSOR_EVENT_NUMERIC_SENSOR_STATE, SENSOR_EVENT_STATE_SENSOR_STATE,
};

/// One link of an event class's handler chain.
pub type EventHandlerFn = fn(&mut Handler, tid: u8, event_data: &[u8]) -> Result<()>;

/// sensorEvent: decode the sub-class and route state/numeric sensor events.
pub fn sensor_event(handler: &mut Handler, tid: u8, event_data: &[u8]) -> Result<()> {
    let (sensor_id, sensor_event_class, class_data) = decode_sensor_event_data(event_data)?;

    match sensor_event_class {
        SENSOR_EVENT_STATE_SENSOR_STATE => {
            state_sensor_event(handler, tid, sensor_id, class_data)
        }
        SENSOR_EVENT_NUMERIC_SENSOR_STATE => {
            let data = decode_numeric_sensor_data(class_data)?;
            handler.signals.numeric_sensor_event(
                tid,
                sensor_id,
                data.event_state,
                data.previous_event_state,
                data.data_size as u8,
                data.present_reading,
            );
            Ok(())
        }
        other => Err(Error::InvalidData(format!(
            "unsupported sensor event class {:#04x}",
            other
        ))),
    }
}

fn state_sensor_event(
    handler: &mut Handler,
    tid: u8,
    sensor_id: u16,
    class_data: &[u8],
) -> Result<()> {
    let data = decode_state_sensor_data(class_data)?;

    handler.signals.state_sensor_event(
        tid,
        sensor_id,
        data.sensor_offset,
        data.event_state,
        data.previous_event_state,
    );

    // Host PDR lookup: exact (tid, sensor) first, then the reserved TID for
    // termini that have not published a terminus locator PDR yet. No mapping
    // means nothing further to do.
    let looked_up = handler
        .host
        .lookup_sensor_info((tid, sensor_id))
        .or_else(|| handler.host.lookup_sensor_info((TID_RESERVED, sensor_id)))
        .cloned();
    let Some((entity_info, composite_states)) = looked_up else {
        return Ok(());
    };

    if data.sensor_offset as usize >= composite_states.len() {
        return Err(Error::InvalidData(format!(
            "sensor offset {} outside composite count {}",
            data.sensor_offset,
            composite_states.len()
        )));
    }
    if !composite_states[data.sensor_offset as usize].contains(&data.event_state) {
        return Err(Error::InvalidData(format!(
            "event state {} not possible at offset {}",
            data.event_state, data.sensor_offset
        )));
    }

    let (container_id, entity_type, entity_instance) = entity_info;
    handler.host.handle_state_sensor_event(
        StateSensorEntry {
            container_id,
            entity_type,
            entity_instance,
            sensor_offset: data.sensor_offset,
        },
        data.event_state,
    )
}

/// pldmMessagePollEvent: surface the event id for the poller to pick up.
pub fn message_poll_event(handler: &mut Handler, tid: u8, event_data: &[u8]) -> Result<()> {
    let data = decode_message_poll_event_data(event_data)?;
    log::debug!(
        "[events::message_poll_event] TID={} EVENT_ID={:#06x}",
        tid,
        data.event_id
    );
    handler.signals.message_poll_event(
        tid,
        data.format_version,
        data.event_id,
        data.data_transfer_handle,
    );
    Ok(())
}

/// pdrRepositoryChgEvent: accumulate changed handles and schedule refetch.
pub fn pdr_repository_chg_event(handler: &mut Handler, tid: u8, event_data: &[u8]) -> Result<()> {
    let (format, _record_count, records_data) = decode_repository_chg_event_data(event_data)?;

    if format == FORMAT_IS_PDR_TYPES {
        return Err(Error::InvalidData(
            "pdrRepositoryChgEvent by PDR type is not supported".to_string(),
        ));
    }

    let mut changed_handles = Vec::new();
    if format == FORMAT_IS_PDR_HANDLES {
        for record in parse_change_records(records_data)? {
            if record.operation == RECORDS_ADDED || record.operation == RECORDS_MODIFIED {
                if record.operation == RECORDS_MODIFIED {
                    handler.host.is_modified = true;
                }
                changed_handles.extend(record.handles);
            }
        }
    }

    if format == REFRESH_ENTIRE_REPOSITORY {
        // The event cannot come from a terminus the repository has never
        // seen; drop everything bound to its TID and start over.
        for terminus_handle in handler.host.terminus_handles_for_tid(tid) {
            handler.repo.remove_by_terminus_handle(terminus_handle);
            handler.host.forget_terminus_handle(terminus_handle);
        }
        handler.host.schedule_full_refetch();
    }
    handler.host.schedule_fetch(changed_handles);
    Ok(())
}
