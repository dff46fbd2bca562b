//! Commit log ring
//!
//! K fixed sectors record the metadata of the most recent commits. Commit `n`
//! lands in slot `n mod K`, so once the ring wraps the older record is gone
//! from the log.

use crate::core::digest::Digest;
use crate::core::error::Result;
use crate::core::sector::{SectorAddress, SectorDevice, SectorRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Metadata written to a commit log sector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Logical commit index
    pub index: u64,
    pub digest: Digest,
    pub file: String,
    pub author: String,
    pub timestamp: String,
    pub message: String,
}

impl CommitRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Ring of commit log sectors
#[derive(Debug, Clone)]
pub struct CommitLog {
    range: SectorRange,
    next_index: u64,
}

impl CommitLog {
    pub fn new(range: SectorRange) -> Self {
        debug_assert!(range.len > 0, "commit log needs at least one slot");
        CommitLog {
            range,
            next_index: 0,
        }
    }

    /// Ring size K
    pub fn slots(&self) -> u64 {
        self.range.len
    }

    pub fn range(&self) -> SectorRange {
        self.range
    }

    /// Number of commits recorded so far
    pub fn commit_count(&self) -> u64 {
        self.next_index
    }

    /// Index the next commit will receive
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Sector address of slot `slot`
    pub fn slot_address(&self, slot: u64) -> SectorAddress {
        self.range.start + slot % self.range.len
    }

    /// Sector the commit with `index` is written to
    pub fn address_for(&self, index: u64) -> SectorAddress {
        self.slot_address(index % self.range.len)
    }

    /// Write a record into slot `index mod K` and advance the index
    pub fn append<D: SectorDevice>(&mut self, device: &mut D, record: &CommitRecord) -> Result<SectorAddress> {
        let address = self.address_for(record.index);
        device.write_sector(address, &record.encode()?);
        self.next_index = self.next_index.max(record.index + 1);

        debug!(
            "Commit {} ({}) logged in sector {}",
            record.index,
            record.digest.short(),
            address
        );

        Ok(address)
    }

    /// Record currently held by a slot, if the sector holds one
    ///
    /// Slots outside the ring yield `None`.
    pub fn read_slot<D: SectorDevice>(&self, device: &D, slot: u64) -> Option<CommitRecord> {
        if slot >= self.range.len {
            return None;
        }
        let address = self.slot_address(slot);
        let bytes = device.read_sector(address);
        if bytes.is_empty() {
            return None;
        }

        match CommitRecord::decode(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Commit log sector {} is unreadable: {}", address, e);
                None
            }
        }
    }

    /// Every readable record, oldest first
    pub fn records<D: SectorDevice>(&self, device: &D) -> Vec<CommitRecord> {
        let mut records: Vec<CommitRecord> = (0..self.range.len)
            .filter_map(|slot| self.read_slot(device, slot))
            .collect();
        records.sort_by_key(|record| record.index);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sector::SectorStore;

    fn record(index: u64) -> CommitRecord {
        CommitRecord {
            index,
            digest: Digest::of_payload(format!("payload {}", index).as_bytes()),
            file: "teddy_server.py".to_string(),
            author: "rushikesh648".to_string(),
            timestamp: "2024-01-01 00:00:00".to_string(),
            message: format!("commit {}", index),
        }
    }

    #[test]
    fn test_record_encoding() {
        let original = record(3);
        let bytes = original.encode().unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("rushikesh648"));
        assert_eq!(CommitRecord::decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_slot_addresses() {
        let log = CommitLog::new(SectorRange::new(100, 5));
        assert_eq!(log.address_for(0), 100);
        assert_eq!(log.address_for(4), 104);
        assert_eq!(log.address_for(5), 100);
        assert_eq!(log.address_for(12), 102);
    }

    #[test]
    fn test_ring_wraparound() {
        let mut store = SectorStore::new(1);
        let mut log = CommitLog::new(SectorRange::new(100, 5));

        for i in 0..6 {
            log.append(&mut store, &record(i)).unwrap();
        }

        assert_eq!(log.commit_count(), 6);
        assert_eq!(log.read_slot(&store, 0).unwrap().index, 5);
        assert_eq!(log.read_slot(&store, 1).unwrap().index, 1);
        assert!(log.read_slot(&store, 5).is_none());
        assert!(log.read_slot(&store, 7).is_none());

        let indices: Vec<u64> = log.records(&store).iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unreadable_slot_is_skipped() {
        let mut store = SectorStore::new(1);
        let log = CommitLog::new(SectorRange::new(100, 5));
        store.write_sector(101, b"not json");
        assert!(log.read_slot(&store, 0).is_none());
        assert!(log.read_slot(&store, 1).is_none());
        assert!(log.records(&store).is_empty());
    }
}
