//! Compactor
//!
//! Reassembles a file from its extents in list order, frees the old sectors
//! and rewrites the payload as one contiguous run starting at a chosen
//! address. Afterwards the extent list is `[base, base + 1, ..., base + n - 1]`.

use crate::core::allocation::{AllocationTable, ExtentList};
use crate::core::config::CompactionPolicy;
use crate::core::error::{DiskError, Result};
use crate::core::fragment::{chunk_count, split_payload, write_chunks};
use crate::core::placement;
use crate::core::sector::{SectorAddress, SectorDevice};
use tracing::{debug, info};

/// Outcome of a compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    /// Extents before compaction
    pub old_extents: ExtentList,
    /// Contiguous extents after compaction
    pub new_extents: ExtentList,
    /// Fragment size the payload was re-split with
    pub fragment_size: usize,
    /// Payload length in bytes
    pub bytes: usize,
}

/// Compact `file` onto `[new_base, new_base + n)`
///
/// Target addresses are validated before the old sectors are deleted, so an
/// error leaves both the table and the sectors unchanged.
pub fn compact<D: SectorDevice>(
    device: &mut D,
    table: &mut AllocationTable,
    file: &str,
    new_base: SectorAddress,
    policy: CompactionPolicy,
) -> Result<CompactionReport> {
    let old_extents = table
        .get(file)
        .cloned()
        .ok_or_else(|| DiskError::FileNotFound(file.to_string()))?;

    // Reassemble in list order
    let payload = placement::reassemble(device, &old_extents);

    let fragment_size = policy.fragment_size(payload.len(), old_extents.len());
    let count = chunk_count(payload.len(), fragment_size);
    let new_extents = ExtentList::contiguous(new_base, count)?;
    placement::check_placement(device, table, file, new_extents.addresses())?;

    // Free the old sectors
    placement::release(device, table, file);
    debug!(
        "Cleared {} fragmented sectors of {}: {:?}",
        old_extents.len(),
        file,
        old_extents.addresses()
    );

    // Rewrite contiguously
    let chunks = split_payload(&payload, fragment_size)?;
    write_chunks(device, new_extents.addresses(), &chunks);
    table.assign(file, new_extents.clone());

    if let Some(last) = new_extents.last() {
        device.advance_cursor(last.saturating_add(1));
    }

    info!(
        "Compacted {}: {} extents ({} breaks) -> {} contiguous extents at {}",
        file,
        old_extents.len(),
        old_extents.fragment_count(),
        new_extents.len(),
        new_base
    );

    Ok(CompactionReport {
        old_extents,
        new_extents,
        fragment_size,
        bytes: payload.len(),
    })
}
