//! Fragmenting writer
//!
//! Splits a payload into fixed-size chunks and places chunk `i` at
//! `base + i * stride`. A stride greater than one keeps the chunks apart,
//! which is what makes the resulting file fragmented.

use crate::core::allocation::{AllocationTable, ExtentList};
use crate::core::error::{DiskError, Result};
use crate::core::placement;
use crate::core::sector::{SectorAddress, SectorDevice};
use tracing::debug;

/// Split `payload` into `ceil(len / fragment_size)` chunks, the last possibly shorter
pub fn split_payload(payload: &[u8], fragment_size: usize) -> Result<Vec<&[u8]>> {
    if fragment_size == 0 {
        return Err(DiskError::InvalidFragmentSize(fragment_size));
    }
    Ok(payload.chunks(fragment_size).collect())
}

/// Number of chunks `split_payload` produces
pub fn chunk_count(len: usize, fragment_size: usize) -> usize {
    if fragment_size == 0 {
        return 0;
    }
    (len + fragment_size - 1) / fragment_size
}

/// Where the chunks of a fragmented write go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentLayout {
    /// Address of chunk 0
    pub base: SectorAddress,
    /// Distance between consecutive chunks
    pub stride: u64,
}

impl FragmentLayout {
    pub fn new(base: SectorAddress, stride: u64) -> Self {
        FragmentLayout { base, stride }
    }

    pub fn addresses(&self, count: usize) -> Result<Vec<SectorAddress>> {
        placement::strided(self.base, self.stride, count)
    }
}

/// Write `chunks` to `addresses` pairwise
pub fn write_chunks<D: SectorDevice>(device: &mut D, addresses: &[SectorAddress], chunks: &[&[u8]]) {
    for (&address, chunk) in addresses.iter().zip(chunks) {
        device.write_sector(address, chunk);
    }
}

/// Write a payload as a fragmented file and replace its table entry
///
/// Placement is validated before anything is touched. The file's previous
/// sectors are released first, so it may reuse its own addresses.
pub fn fragment_write<D: SectorDevice>(
    device: &mut D,
    table: &mut AllocationTable,
    file: &str,
    payload: &[u8],
    fragment_size: usize,
    layout: FragmentLayout,
) -> Result<ExtentList> {
    let chunks = split_payload(payload, fragment_size)?;
    let addresses = layout.addresses(chunks.len())?;
    placement::check_placement(device, table, file, &addresses)?;

    if let Some(old) = placement::release(device, table, file) {
        debug!("Released {} old sectors of {}", old.len(), file);
    }

    write_chunks(device, &addresses, &chunks);

    let extents = ExtentList::new(addresses);
    table.assign(file, extents.clone());

    debug!(
        "Fragmented {} ({} bytes) into {} chunks: {:?}",
        file,
        payload.len(),
        chunks.len(),
        extents.addresses()
    );

    Ok(extents)
}
