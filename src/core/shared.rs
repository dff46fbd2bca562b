//! Thread-safe handle to a [`Disk`]
//!
//! Every mutation runs under one exclusive guard for its whole duration, so no
//! reader can observe a file between releasing its old sectors and assigning
//! its new ones. Reads take a shared guard. Guards drop on every exit path,
//! including `?` returns.

use crate::core::allocation::ExtentList;
use crate::core::backup::BackupReport;
use crate::core::collapse::CollapseReport;
use crate::core::commit_log::CommitRecord;
use crate::core::digest::{Clock, Digest};
use crate::core::disk::{Disk, DiskStats};
use crate::core::error::Result;
use crate::core::sector::SectorAddress;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, lock-protected disk
#[derive(Debug, Clone)]
pub struct SharedDisk {
    inner: Arc<RwLock<Disk>>,
}

impl SharedDisk {
    pub fn new(disk: Disk) -> Self {
        SharedDisk {
            inner: Arc::new(RwLock::new(disk)),
        }
    }

    pub fn write(&self, file: &str, payload: &[u8]) -> Result<ExtentList> {
        self.inner.write().write(file, payload)
    }

    pub fn write_at(&self, file: &str, address: SectorAddress, payload: &[u8]) -> Result<ExtentList> {
        self.inner.write().write_at(file, address, payload)
    }

    pub fn read(&self, file: &str) -> Result<Vec<u8>> {
        self.inner.read().read(file)
    }

    pub fn fragment_write(&self, file: &str, payload: &[u8], fragment_size: usize) -> Result<ExtentList> {
        self.inner.write().fragment_write(file, payload, fragment_size)
    }

    pub fn compact(&self, file: &str, new_base: SectorAddress) -> Result<ExtentList> {
        self.inner.write().compact(file, new_base)
    }

    pub fn defragment(&self, file: &str) -> Result<ExtentList> {
        self.inner.write().defragment(file)
    }

    pub fn commit(
        &self,
        file: &str,
        payload: &[u8],
        author: &str,
        message: &str,
        clock: &dyn Clock,
    ) -> Result<Digest> {
        self.inner.write().commit(file, payload, author, message, clock)
    }

    pub fn rollback(&self, file: &str, target: &Digest) -> Result<()> {
        self.inner.write().rollback(file, target)
    }

    pub fn collapse(&self) -> CollapseReport {
        self.inner.write().collapse()
    }

    pub fn backup(&self, files: &[&str], clock: &dyn Clock) -> Result<BackupReport> {
        self.inner.write().backup(files, clock)
    }

    pub fn restore_backup(&self, file: &str) -> Result<ExtentList> {
        self.inner.write().restore_backup(file)
    }

    pub fn extents_of(&self, file: &str) -> Result<ExtentList> {
        self.inner.read().extents_of(file)
    }

    pub fn exists(&self, file: &str) -> bool {
        self.inner.read().exists(file)
    }

    pub fn read_sector(&self, address: SectorAddress) -> Vec<u8> {
        self.inner.read().read_sector(address).to_vec()
    }

    pub fn recent_commits(&self) -> Vec<CommitRecord> {
        self.inner.read().recent_commits()
    }

    pub fn stats(&self) -> DiskStats {
        self.inner.read().stats()
    }

    /// Run `f` with shared access to the disk
    pub fn with_read<R>(&self, f: impl FnOnce(&Disk) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` as a single exclusive transaction
    pub fn with_write<R>(&self, f: impl FnOnce(&mut Disk) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl From<Disk> for SharedDisk {
    fn from(disk: Disk) -> Self {
        SharedDisk::new(disk)
    }
}
