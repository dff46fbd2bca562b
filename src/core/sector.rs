//! Sparse sector store
//!
//! Sectors are addressed by a non-negative integer and hold an opaque payload.
//! Only written addresses consume memory. Reading an unwritten address yields
//! an empty payload rather than an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Sector address
pub type SectorAddress = u64;

/// Half-open range of sector addresses `[start, start + len)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRange {
    /// First address in the range
    pub start: SectorAddress,
    /// Number of addresses in the range
    pub len: u64,
}

impl SectorRange {
    pub fn new(start: SectorAddress, len: u64) -> Self {
        SectorRange { start, len }
    }

    /// One past the last address, clamped to the top of the address space
    pub fn end(&self) -> SectorAddress {
        self.start.saturating_add(self.len)
    }

    pub fn contains(&self, address: SectorAddress) -> bool {
        address >= self.start && address - self.start < self.len
    }

    pub fn overlaps(&self, other: &SectorRange) -> bool {
        self.len > 0 && other.len > 0 && self.start < other.end() && other.start < self.end()
    }

    pub fn addresses(&self) -> impl Iterator<Item = SectorAddress> {
        self.start..self.end()
    }
}

/// Storage capability shared by every scenario that touches sectors
///
/// Fragmentation, compaction, versioning, collapse and backup are written
/// against this trait rather than a concrete store.
pub trait SectorDevice {
    /// Overwrite a sector unconditionally
    fn write_sector(&mut self, address: SectorAddress, payload: &[u8]);

    /// Read a sector; unwritten addresses return an empty slice
    fn read_sector(&self, address: SectorAddress) -> &[u8];

    /// Remove a sector's payload, returning what was stored
    fn delete_sector(&mut self, address: SectorAddress) -> Option<Vec<u8>>;

    /// Whether the address currently holds a payload
    fn is_written(&self, address: SectorAddress) -> bool;

    /// All written addresses in ascending order
    fn written_addresses(&self) -> Vec<SectorAddress>;

    /// Next likely-free address for sequential allocation
    fn cursor(&self) -> SectorAddress;

    /// Move the cursor forward to at least `address`
    fn advance_cursor(&mut self, address: SectorAddress);

    /// Whether the address belongs to a reserved range
    fn is_reserved(&self, address: SectorAddress) -> bool;
}

/// In-memory sparse sector store
#[derive(Debug, Clone)]
pub struct SectorStore {
    /// Written sectors keyed by address
    sectors: BTreeMap<SectorAddress, Vec<u8>>,

    /// Free-sector watermark (a hint, never a reservation)
    cursor: SectorAddress,

    /// Ranges the cursor never hands out
    reserved: Vec<SectorRange>,
}

impl SectorStore {
    /// Create an empty store whose cursor starts at `first_free`
    pub fn new(first_free: SectorAddress) -> Self {
        SectorStore {
            sectors: BTreeMap::new(),
            cursor: first_free,
            reserved: Vec::new(),
        }
    }

    /// Declare a reserved range
    pub fn reserve(&mut self, range: SectorRange) {
        self.reserved.push(range);
    }

    pub fn reserved_ranges(&self) -> &[SectorRange] {
        &self.reserved
    }

    /// Number of written sectors
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Total payload bytes held across all sectors
    pub fn bytes_used(&self) -> usize {
        self.sectors.values().map(Vec::len).sum()
    }
}

impl SectorDevice for SectorStore {
    fn write_sector(&mut self, address: SectorAddress, payload: &[u8]) {
        trace!("sector {} <- {} bytes", address, payload.len());
        self.sectors.insert(address, payload.to_vec());

        if address >= self.cursor && !self.is_reserved(address) {
            self.cursor = address.saturating_add(1);
        }
    }

    fn read_sector(&self, address: SectorAddress) -> &[u8] {
        self.sectors.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    fn delete_sector(&mut self, address: SectorAddress) -> Option<Vec<u8>> {
        self.sectors.remove(&address)
    }

    fn is_written(&self, address: SectorAddress) -> bool {
        self.sectors.contains_key(&address)
    }

    fn written_addresses(&self) -> Vec<SectorAddress> {
        self.sectors.keys().copied().collect()
    }

    fn cursor(&self) -> SectorAddress {
        self.cursor
    }

    fn advance_cursor(&mut self, address: SectorAddress) {
        self.cursor = self.cursor.max(address);
    }

    fn is_reserved(&self, address: SectorAddress) -> bool {
        self.reserved.iter().any(|range| range.contains(address))
    }
}
