// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host PDR tracking.
//!
//! The host terminus publishes its own PDRs to the BMC; this module keeps
//! the derived lookup state:
//! - sensor map: (tid, sensor id) -> entity info + composite possible states
//! - terminus locator info: terminus handle -> (tid, eid, validity)
//! - the fetch plan accumulated from repository-change events

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::transport::Eid;

/// Key of the host sensor map.
pub type SensorEntry = (u8, u16);

/// `(container_id, entity_type, entity_instance)` of the sensed entity.
pub type EntityInfo = (u16, u16, u16);

/// Allowed event states per composite offset.
pub type CompositeSensorStates = Vec<BTreeSet<u8>>;

/// Identity tuple handed to the state-sensor handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSensorEntry {
    pub container_id: u16,
    pub entity_type: u16,
    pub entity_instance: u16,
    pub sensor_offset: u8,
}

/// Callback invoked for validated host state-sensor events.
pub type StateSensorHandler = Box<dyn FnMut(StateSensorEntry, u8) -> Result<()>>;

/// Pending host PDR fetch work, drained by the fetch driver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchPlan {
    /// Specific record handles to re-read.
    pub handles: Vec<u32>,
    /// Re-read the entire host repository.
    pub full: bool,
}

impl FetchPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty() && !self.full
    }
}

/// Derived host PDR state.
#[derive(Default)]
pub struct HostPdrTracker {
    sensor_map: HashMap<SensorEntry, (EntityInfo, CompositeSensorStates)>,
    /// terminus handle -> (tid, eid, validity) from terminus locator PDRs.
    tl_info: HashMap<u16, (u8, Eid, u8)>,
    plan: FetchPlan,
    /// Set when a change event reported modified (not just added) records.
    pub is_modified: bool,
    handler: Option<StateSensorHandler>,
}

impl HostPdrTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the typed handler for validated state-sensor events.
    pub fn set_state_sensor_handler(&mut self, handler: StateSensorHandler) {
        self.handler = Some(handler);
    }

    /// Record a host sensor's entity info and composite states.
    pub fn add_sensor_info(
        &mut self,
        entry: SensorEntry,
        info: EntityInfo,
        states: CompositeSensorStates,
    ) {
        self.sensor_map.insert(entry, (info, states));
    }

    /// Look up a host sensor by (tid, sensor id).
    #[must_use]
    pub fn lookup_sensor_info(
        &self,
        entry: SensorEntry,
    ) -> Option<&(EntityInfo, CompositeSensorStates)> {
        self.sensor_map.get(&entry)
    }

    /// Record (or replace) terminus locator info for `terminus_handle`.
    pub fn record_tl_info(&mut self, terminus_handle: u16, tid: u8, eid: Eid, validity: u8) {
        self.tl_info.insert(terminus_handle, (tid, eid, validity));
    }

    /// Terminus handles currently bound to `tid`.
    #[must_use]
    pub fn terminus_handles_for_tid(&self, tid: u8) -> Vec<u16> {
        self.tl_info
            .iter()
            .filter(|(_, &(t, _, _))| t == tid)
            .map(|(&th, _)| th)
            .collect()
    }

    /// Drop terminus locator info (after its records were removed).
    pub fn forget_terminus_handle(&mut self, terminus_handle: u16) {
        self.tl_info.remove(&terminus_handle);
    }

    /// Queue specific record handles for refetch.
    pub fn schedule_fetch(&mut self, handles: impl IntoIterator<Item = u32>) {
        self.plan.handles.extend(handles);
    }

    /// Queue a full repository refetch.
    pub fn schedule_full_refetch(&mut self) {
        self.plan.full = true;
    }

    /// Drain the accumulated fetch plan.
    pub fn take_fetch_plan(&mut self) -> FetchPlan {
        std::mem::take(&mut self.plan)
    }

    /// Invoke the installed state-sensor handler. Without one the event is
    /// accepted and dropped.
    pub fn handle_state_sensor_event(
        &mut self,
        entry: StateSensorEntry,
        event_state: u8,
    ) -> Result<()> {
        match self.handler.as_mut() {
            Some(handler) => handler(entry, event_state),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn states(list: &[u8]) -> BTreeSet<u8> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_sensor_lookup() {
        let mut tracker = HostPdrTracker::new();
        tracker.add_sensor_info((7, 0x10), (1, 64, 2), vec![states(&[0, 1, 2])]);

        assert!(tracker.lookup_sensor_info((7, 0x10)).is_some());
        assert!(tracker.lookup_sensor_info((7, 0x11)).is_none());
        assert!(tracker.lookup_sensor_info((8, 0x10)).is_none());
    }

    #[test]
    fn test_terminus_handles_for_tid() {
        let mut tracker = HostPdrTracker::new();
        tracker.record_tl_info(10, 7, 20, 1);
        tracker.record_tl_info(11, 7, 21, 1);
        tracker.record_tl_info(12, 9, 22, 1);

        let mut handles = tracker.terminus_handles_for_tid(7);
        handles.sort_unstable();
        assert_eq!(handles, vec![10, 11]);

        tracker.forget_terminus_handle(10);
        assert_eq!(tracker.terminus_handles_for_tid(7), vec![11]);
    }

    #[test]
    fn test_fetch_plan_accumulates_and_drains() {
        let mut tracker = HostPdrTracker::new();
        assert!(tracker.take_fetch_plan().is_empty());

        tracker.schedule_fetch([1, 2]);
        tracker.schedule_fetch([3]);
        tracker.schedule_full_refetch();

        let plan = tracker.take_fetch_plan();
        assert_eq!(plan.handles, vec![1, 2, 3]);
        assert!(plan.full);
        assert!(tracker.take_fetch_plan().is_empty());
    }

    #[test]
    fn test_state_sensor_handler_invoked() {
        let mut tracker = HostPdrTracker::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        tracker.set_state_sensor_handler(Box::new(move |entry, state| {
            assert_eq!(entry.sensor_offset, 1);
            assert_eq!(state, 2);
            hits2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let entry = StateSensorEntry {
            container_id: 0,
            entity_type: 64,
            entity_instance: 1,
            sensor_offset: 1,
        };
        tracker.handle_state_sensor_event(entry, 2).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_handler_is_accepted() {
        let mut tracker = HostPdrTracker::new();
        let entry = StateSensorEntry {
            container_id: 0,
            entity_type: 64,
            entity_instance: 1,
            sensor_offset: 0,
        };
        assert!(tracker.handle_state_sensor_event(entry, 1).is_ok());
    }
}
