//! Collapse: total loss of the metadata plane
//!
//! The allocation table is discarded and a fixed set of critical sectors is
//! wiped. Every other sector keeps its bytes; they are simply unreachable.

use crate::core::allocation::AllocationTable;
use crate::core::sector::{SectorAddress, SectorDevice};
use tracing::{info, warn};

/// What a collapse destroyed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseReport {
    /// Number of file ids that lost their allocation entry
    pub files_unmounted: usize,
    /// Critical addresses wiped (whether or not they held data)
    pub sectors_zeroed: Vec<SectorAddress>,
    /// Critical addresses that actually held a payload
    pub sectors_destroyed: usize,
}

/// Discard the table and delete every address in `critical`
pub fn collapse<D: SectorDevice>(
    device: &mut D,
    table: &mut AllocationTable,
    critical: &[SectorAddress],
) -> CollapseReport {
    warn!("System collapse initiated");

    let files_unmounted = table.clear();

    let mut sectors_destroyed = 0;
    for &address in critical {
        if device.delete_sector(address).is_some() {
            sectors_destroyed += 1;
        }
    }

    info!(
        "Collapse complete: {} files unmounted, {} of {} critical sectors held data",
        files_unmounted,
        sectors_destroyed,
        critical.len()
    );

    CollapseReport {
        files_unmounted,
        sectors_zeroed: critical.to_vec(),
        sectors_destroyed,
    }
}
