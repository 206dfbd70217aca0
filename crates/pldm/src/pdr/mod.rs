// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform descriptor record repository.
//!
//! In-memory store of packed PDRs indexed by record handle. Handles are
//! assigned densely from 1 and stay stable for the life of the record;
//! removal retires the handle for the session. Enumeration follows insertion
//! order via the `next_record_handle` chain, terminating at 0.

/// JSON descriptor ingestion building PDRs and bus mappings.
pub mod generator;
/// Typed PDR records and the common header.
pub mod types;

use crate::error::{Error, Result};
use types::{embedded_terminus_handle, PdrHeader, PDR_HEADER_BYTES};

/// Borrowed view of one stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdrEntry<'a> {
    pub record_handle: u32,
    /// Handle of the record following this one in traversal order, 0 for
    /// the terminal record.
    pub next_record_handle: u32,
    /// Packed record bytes, header included.
    pub data: &'a [u8],
}

impl PdrEntry<'_> {
    /// Record size in bytes (header included).
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

struct StoredRecord {
    handle: u32,
    data: Vec<u8>,
}

/// Handle-indexed PDR store.
#[derive(Default)]
pub struct PdrRepo {
    records: Vec<StoredRecord>,
    next_handle: u32,
}

impl PdrRepo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_handle: 1,
        }
    }

    /// Append a packed record.
    ///
    /// A zero `record_handle` in the header receives the next dense handle;
    /// a non-zero handle (host-fetched records keep theirs) is preserved and
    /// advances the allocator past it. Returns the handle in effect.
    pub fn add(&mut self, mut record: Vec<u8>) -> Result<u32> {
        let header = PdrHeader::unpack(&record)?;
        if record.len() != PDR_HEADER_BYTES + header.length as usize {
            return Err(Error::InvalidData(format!(
                "record length field {} disagrees with data size {}",
                header.length,
                record.len() - PDR_HEADER_BYTES
            )));
        }
        let handle = if header.record_handle == 0 {
            let h = self.next_handle;
            record[0..4].copy_from_slice(&h.to_le_bytes());
            h
        } else {
            header.record_handle
        };
        if self.records.iter().any(|r| r.handle == handle) {
            return Err(Error::InvalidData(format!(
                "duplicate record handle {:#x}",
                handle
            )));
        }
        self.next_handle = self.next_handle.max(handle + 1);
        self.records.push(StoredRecord {
            handle,
            data: record,
        });
        Ok(handle)
    }

    fn entry_at(&self, index: usize) -> PdrEntry<'_> {
        let record = &self.records[index];
        PdrEntry {
            record_handle: record.handle,
            next_record_handle: self
                .records
                .get(index + 1)
                .map_or(0, |next| next.handle),
            data: &record.data,
        }
    }

    /// Look up a record by handle. Handle 0 addresses the first record, per
    /// the GetPDR convention; no stored record ever carries handle 0.
    #[must_use]
    pub fn get_by_handle(&self, handle: u32) -> Option<PdrEntry<'_>> {
        if handle == 0 {
            return self.get_first();
        }
        self.records
            .iter()
            .position(|r| r.handle == handle)
            .map(|i| self.entry_at(i))
    }

    /// First record in traversal order.
    #[must_use]
    pub fn get_first(&self) -> Option<PdrEntry<'_>> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.entry_at(0))
        }
    }

    /// Record following `cursor` (a handle previously returned). `None` once
    /// the chain is exhausted or the cursor no longer exists.
    #[must_use]
    pub fn get_next(&self, cursor: u32) -> Option<PdrEntry<'_>> {
        let index = self.records.iter().position(|r| r.handle == cursor)?;
        if index + 1 < self.records.len() {
            Some(self.entry_at(index + 1))
        } else {
            None
        }
    }

    /// Copy every record of `pdr_type` into `dst`, preserving handles.
    pub fn filter_by_type(&self, pdr_type: u8, dst: &mut PdrRepo) -> Result<()> {
        for record in &self.records {
            let header = PdrHeader::unpack(&record.data)?;
            if header.pdr_type == pdr_type {
                dst.add(record.data.clone())?;
            }
        }
        Ok(())
    }

    /// Remove every record whose embedded terminus handle equals
    /// `terminus_handle`. Returns the removed record handles.
    pub fn remove_by_terminus_handle(&mut self, terminus_handle: u16) -> Vec<u32> {
        let mut removed = Vec::new();
        self.records.retain(|record| {
            if embedded_terminus_handle(&record.data) == Some(terminus_handle) {
                removed.push(record.handle);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            log::info!(
                "[PdrRepo::remove_by_terminus_handle] removed {} records, TERMINUS_HANDLE={}",
                removed.len(),
                terminus_handle
            );
        }
        removed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
