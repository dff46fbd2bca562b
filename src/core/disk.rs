//! Disk: the sector store, allocation table and version archive behind one API
//!
//! `Disk` owns every piece of state explicitly. Each operation validates its
//! placement up front and then mutates the sector store and the allocation
//! table in one call, so a returned error never leaves a half-written file.

use crate::core::allocation::{AllocationTable, ExtentList};
use crate::core::backup::{self, BackupReport};
use crate::core::collapse::{self, CollapseReport};
use crate::core::commit_log::{CommitLog, CommitRecord};
use crate::core::compactor::{self, CompactionReport};
use crate::core::config::DiskConfig;
use crate::core::digest::{Clock, Digest};
use crate::core::error::{DiskError, Result};
use crate::core::fragment::{self, FragmentLayout};
use crate::core::placement;
use crate::core::sector::{SectorAddress, SectorDevice, SectorStore};
use crate::core::version::VersionStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Point-in-time counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStats {
    /// Files with an allocation entry
    pub files: usize,
    /// Files whose extents are not one contiguous run
    pub fragmented_files: usize,
    /// Sectors holding a payload (including unreferenced ones)
    pub written_sectors: usize,
    /// Sectors referenced by some allocation entry
    pub allocated_sectors: usize,
    pub bytes_used: usize,
    /// Free-sector cursor
    pub cursor: SectorAddress,
    /// Snapshots across all files
    pub versions: usize,
    /// Commits recorded since creation
    pub commits: u64,
}

/// In-memory block device
#[derive(Debug, Clone)]
pub struct Disk {
    config: DiskConfig,
    store: SectorStore,
    table: AllocationTable,
    versions: VersionStore,
    commit_log: CommitLog,
    backup_generation: u64,
}

impl Disk {
    /// Create an empty disk
    pub fn new(config: DiskConfig) -> Result<Self> {
        config.validate()?;

        let mut store = SectorStore::new(config.first_free_sector);
        for range in config.reserved_ranges() {
            store.reserve(range);
        }

        info!(
            "Created disk: sector size {}, commit log {}..{}, backup region {}..{}",
            config.sector_size,
            config.commit_log.base,
            config.commit_log.range().end(),
            config.backup.base,
            config.backup.range().end()
        );

        Ok(Disk {
            commit_log: CommitLog::new(config.commit_log.range()),
            config,
            store,
            table: AllocationTable::new(),
            versions: VersionStore::new(),
            backup_generation: 0,
        })
    }

    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Write a file onto the first free contiguous run at or after the cursor
    ///
    /// The payload is split into `sector_size` chunks. The file's previous
    /// sectors are freed first.
    pub fn write(&mut self, file: &str, payload: &[u8]) -> Result<ExtentList> {
        validate_file_id(file)?;
        let chunks = fragment::split_payload(payload, self.config.sector_size)?;

        let base = placement::find_contiguous(&self.store, &self.table, file, chunks.len())?;
        let extents = ExtentList::contiguous(base, chunks.len())?;

        placement::release(&mut self.store, &mut self.table, file);
        fragment::write_chunks(&mut self.store, extents.addresses(), &chunks);
        self.table.assign(file, extents.clone());

        debug!(
            "Wrote {} ({} bytes) to {:?}",
            file,
            payload.len(),
            extents.addresses()
        );
        Ok(extents)
    }

    /// Mount a file at an explicit sector, whole payload in one sector
    pub fn write_at(&mut self, file: &str, address: SectorAddress, payload: &[u8]) -> Result<ExtentList> {
        validate_file_id(file)?;
        placement::check_placement(&self.store, &self.table, file, &[address])?;
        let extents = self.place_single(file, address, payload);
        debug!("Mounted {} at sector {}", file, address);
        Ok(extents)
    }

    /// Reassemble a file from its extents
    pub fn read(&self, file: &str) -> Result<Vec<u8>> {
        let extents = self.extents(file)?;
        Ok(placement::reassemble(&self.store, extents))
    }

    /// Write a file in fragments placed `fragment_stride` apart
    ///
    /// The base is chosen `fragment_gap` past the cursor and moved forward
    /// until every fragment address is free.
    pub fn fragment_write(&mut self, file: &str, payload: &[u8], fragment_size: usize) -> Result<ExtentList> {
        validate_file_id(file)?;
        if fragment_size == 0 {
            return Err(DiskError::InvalidFragmentSize(fragment_size));
        }

        let count = fragment::chunk_count(payload.len(), fragment_size);
        let base = placement::find_strided(
            &self.store,
            &self.table,
            file,
            self.store.cursor().saturating_add(self.config.fragment_gap),
            self.config.fragment_stride,
            count,
        )?;
        self.fragment_write_at(file, payload, fragment_size, base)
    }

    /// Write a file in fragments starting at an explicit base
    pub fn fragment_write_at(
        &mut self,
        file: &str,
        payload: &[u8],
        fragment_size: usize,
        base: SectorAddress,
    ) -> Result<ExtentList> {
        validate_file_id(file)?;
        let layout = FragmentLayout::new(base, self.config.fragment_stride);
        let extents = fragment::fragment_write(
            &mut self.store,
            &mut self.table,
            file,
            payload,
            fragment_size,
            layout,
        )?;

        info!(
            "Fragmented {} into {} extents from sector {}",
            file,
            extents.len(),
            base
        );
        Ok(extents)
    }

    /// Rewrite a file contiguously from `new_base`
    pub fn compact(&mut self, file: &str, new_base: SectorAddress) -> Result<ExtentList> {
        Ok(self.compact_with_report(file, new_base)?.new_extents)
    }

    /// [`Disk::compact`], returning the before/after detail
    pub fn compact_with_report(&mut self, file: &str, new_base: SectorAddress) -> Result<CompactionReport> {
        compactor::compact(
            &mut self.store,
            &mut self.table,
            file,
            new_base,
            self.config.compaction,
        )
    }

    /// Compact onto the first contiguous run large enough for the file
    pub fn defragment(&mut self, file: &str) -> Result<ExtentList> {
        let extents = self.extents(file)?;
        let len: usize = extents
            .iter()
            .map(|&address| self.store.read_sector(address).len())
            .sum();
        let size = self.config.compaction.fragment_size(len, extents.len());
        let count = fragment::chunk_count(len, size);

        let base = placement::find_contiguous(&self.store, &self.table, file, count)?;
        self.compact(file, base)
    }

    /// Commit a new payload and return its commit digest
    ///
    /// The current payload (empty for an unknown file) is archived under its
    /// content digest before being replaced, so it stays a rollback target.
    pub fn commit(
        &mut self,
        file: &str,
        payload: &[u8],
        author: &str,
        message: &str,
        clock: &dyn Clock,
    ) -> Result<Digest> {
        validate_file_id(file)?;
        let address = self.single_sector_target(file)?;

        let current = match self.table.get(file) {
            Some(extents) => placement::reassemble(&self.store, extents),
            None => Vec::new(),
        };
        let previous = self.versions.capture(file, &current);

        let timestamp = clock.timestamp();
        let digest = Digest::of_commit(&timestamp, author, message, payload);
        self.versions.insert(file, digest.clone(), payload);

        self.place_single(file, address, payload);

        let record = CommitRecord {
            index: self.commit_log.next_index(),
            digest: digest.clone(),
            file: file.to_string(),
            author: author.to_string(),
            timestamp,
            message: message.to_string(),
        };
        let slot = self.commit_log.append(&mut self.store, &record)?;

        info!(
            "Committed {} as {} (previous {}) at sector {}, logged in sector {}",
            file,
            digest.short(),
            previous.short(),
            address,
            slot
        );
        Ok(digest)
    }

    /// Restore a file to a stored version
    ///
    /// The discarded payload is only archived when `snapshot_on_rollback` is
    /// set.
    pub fn rollback(&mut self, file: &str, target: &Digest) -> Result<()> {
        validate_file_id(file)?;

        let payload = self
            .versions
            .get(file, target)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| DiskError::TargetVersionNotFound {
                file: file.to_string(),
                digest: target.to_string(),
            })?;
        let address = self.single_sector_target(file)?;

        if self.config.snapshot_on_rollback {
            if let Some(extents) = self.table.get(file) {
                let discarded = placement::reassemble(&self.store, extents);
                let digest = self.versions.capture(file, &discarded);
                debug!("Archived discarded state of {} as {}", file, digest.short());
            }
        }

        self.place_single(file, address, &payload);

        info!("Rolled back {} to {} at sector {}", file, target.short(), address);
        Ok(())
    }

    /// Drop the allocation table and wipe the critical sectors
    pub fn collapse(&mut self) -> CollapseReport {
        let critical = self.config.critical_sectors();
        collapse::collapse(&mut self.store, &mut self.table, &critical)
    }

    /// Copy files into the backup region
    ///
    /// Every run writes its records from the start of the region, so records
    /// left by earlier runs may be overwritten. A file backed up only by an
    /// earlier run can no longer be restored once a later run covers its
    /// sector; back up every file that must stay restorable in one run.
    pub fn backup(&mut self, files: &[&str], clock: &dyn Clock) -> Result<BackupReport> {
        let generation = self.backup_generation + 1;
        let report = backup::backup(
            &mut self.store,
            &self.table,
            self.config.backup.range(),
            files,
            &clock.timestamp(),
            generation,
        )?;
        self.backup_generation = generation;

        info!(
            "Backup {} stored {} files from sector {}",
            generation,
            files.len(),
            self.config.backup.base
        );
        Ok(report)
    }

    /// Re-mount a file from its newest backup record
    pub fn restore_backup(&mut self, file: &str) -> Result<ExtentList> {
        let record = backup::latest(&self.store, self.config.backup.range(), file)
            .ok_or_else(|| DiskError::BackupNotFound(file.to_string()))?;

        info!(
            "Restoring {} from backup {} taken {}",
            file, record.generation, record.taken_at
        );
        self.write(file, &record.payload)
    }

    /// Ordered sector addresses of a file
    pub fn extents_of(&self, file: &str) -> Result<ExtentList> {
        self.extents(file).cloned()
    }

    pub fn exists(&self, file: &str) -> bool {
        self.table.contains(file)
    }

    /// File ids in sorted order
    pub fn files(&self) -> Vec<String> {
        self.table.files()
    }

    /// Raw sector read, bypassing the allocation table
    pub fn read_sector(&self, address: SectorAddress) -> &[u8] {
        self.store.read_sector(address)
    }

    pub fn cursor(&self) -> SectorAddress {
        self.store.cursor()
    }

    /// Digests stored for a file, oldest first
    pub fn history(&self, file: &str) -> Vec<Digest> {
        self.versions.history(file)
    }

    /// A stored snapshot
    pub fn version(&self, file: &str, digest: &Digest) -> Option<&[u8]> {
        self.versions.get(file, digest)
    }

    /// Record currently held by commit log slot `slot`
    ///
    /// Returns `None` for `slot >= commit_log.slots`.
    pub fn commit_log_slot(&self, slot: u64) -> Option<CommitRecord> {
        self.commit_log.read_slot(&self.store, slot)
    }

    /// Commit records still present in the log, oldest first
    pub fn recent_commits(&self) -> Vec<CommitRecord> {
        self.commit_log.records(&self.store)
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_log.commit_count()
    }

    pub fn stats(&self) -> DiskStats {
        DiskStats {
            files: self.table.len(),
            fragmented_files: self
                .table
                .iter()
                .filter(|(_, extents)| !extents.is_contiguous())
                .count(),
            written_sectors: self.store.len(),
            allocated_sectors: self.table.iter().map(|(_, extents)| extents.len()).sum(),
            bytes_used: self.store.bytes_used(),
            cursor: self.store.cursor(),
            versions: self.versions.len(),
            commits: self.commit_log.commit_count(),
        }
    }

    fn extents(&self, file: &str) -> Result<&ExtentList> {
        self.table
            .get(file)
            .ok_or_else(|| DiskError::FileNotFound(file.to_string()))
    }

    /// Sector for a single-extent rewrite: the file's first address, else a fresh one
    fn single_sector_target(&self, file: &str) -> Result<SectorAddress> {
        match self
            .table
            .get(file)
            .and_then(ExtentList::first)
            .filter(|&address| !self.store.is_reserved(address))
        {
            Some(address) => Ok(address),
            None => placement::find_contiguous(&self.store, &self.table, file, 1),
        }
    }

    /// Replace a file's sectors with one sector holding `payload`
    fn place_single(&mut self, file: &str, address: SectorAddress, payload: &[u8]) -> ExtentList {
        placement::release(&mut self.store, &mut self.table, file);
        self.store.write_sector(address, payload);
        let extents = ExtentList::new(vec![address]);
        self.table.assign(file, extents.clone());
        extents
    }
}

fn validate_file_id(file: &str) -> Result<()> {
    if file.trim().is_empty() {
        return Err(DiskError::InvalidFileId(file.to_string()));
    }
    Ok(())
}
