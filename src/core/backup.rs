//! Backup region
//!
//! Copies of file payloads are written as self-describing records into a
//! reserved range. The region is outside the collapse set, and because each
//! record names its file, a backup can be restored without the allocation
//! table.

use crate::core::allocation::AllocationTable;
use crate::core::error::{DiskError, Result};
use crate::core::placement;
use crate::core::sector::{SectorAddress, SectorDevice, SectorRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One backed-up file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub file: String,
    /// Timestamp of the backup run
    pub taken_at: String,
    /// Backup run number, increasing across runs
    pub generation: u64,
    pub payload: Vec<u8>,
}

/// Backup locations produced by one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub generation: u64,
    /// `(file, sector)` in the order requested
    pub placements: Vec<(String, SectorAddress)>,
}

impl BackupReport {
    pub fn sector_of(&self, file: &str) -> Option<SectorAddress> {
        self.placements
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, address)| *address)
    }
}

/// Write a backup record for each file into consecutive region sectors
///
/// Every file is read before anything is written; a missing file or an
/// oversized request leaves the region untouched. Each run starts again at
/// the beginning of the region, overwriting records from earlier runs.
pub fn backup<D: SectorDevice>(
    device: &mut D,
    table: &AllocationTable,
    region: SectorRange,
    files: &[&str],
    taken_at: &str,
    generation: u64,
) -> Result<BackupReport> {
    if files.len() as u64 > region.len {
        return Err(DiskError::BackupRegionFull {
            needed: files.len(),
            capacity: region.len as usize,
        });
    }

    let mut encoded = Vec::with_capacity(files.len());
    for &file in files {
        let extents = table
            .get(file)
            .ok_or_else(|| DiskError::FileNotFound(file.to_string()))?;
        let record = BackupRecord {
            file: file.to_string(),
            taken_at: taken_at.to_string(),
            generation,
            payload: placement::reassemble(device, extents),
        };
        encoded.push((file, serde_json::to_vec(&record)?));
    }

    let mut report = BackupReport {
        generation,
        placements: Vec::with_capacity(files.len()),
    };
    for ((file, bytes), address) in encoded.into_iter().zip(region.addresses()) {
        device.write_sector(address, &bytes);
        debug!("Backed up {} to sector {}", file, address);
        report.placements.push((file.to_string(), address));
    }

    Ok(report)
}

/// Every readable record in the region
pub fn scan<D: SectorDevice>(device: &D, region: SectorRange) -> Vec<(SectorAddress, BackupRecord)> {
    region
        .addresses()
        .filter(|&address| device.is_written(address))
        .filter_map(|address| {
            match serde_json::from_slice::<BackupRecord>(device.read_sector(address)) {
                Ok(record) => Some((address, record)),
                Err(e) => {
                    warn!("Backup sector {} is unreadable: {}", address, e);
                    None
                }
            }
        })
        .collect()
}

/// Newest record for `file` in the region
pub fn latest<D: SectorDevice>(device: &D, region: SectorRange, file: &str) -> Option<BackupRecord> {
    scan(device, region)
        .into_iter()
        .map(|(_, record)| record)
        .filter(|record| record.file == file)
        .max_by_key(|record| record.generation)
}
