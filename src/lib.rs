//! # Planet Disk - Sector Allocation Model
//!
//! `planet-disk` models the allocation layer of a block-addressed device. Files
//! are placed onto numbered sectors, can be written fragmented, compacted back
//! into contiguous runs, committed to a content-addressed history and rolled
//! back. A collapse operation models total loss of the allocation table while
//! the raw sectors survive.
//!
//! - **Sparse sectors**: only written addresses consume memory
//! - **Fragmentation and compaction** with a configurable sizing policy
//! - **Commit/rollback** keyed by SHA-256 digests, with a ring-buffer commit log
//! - **Backup region** that outlives a collapse
//!
//! ## Quick Start
//!
//! ```rust
//! use planet_disk::{Disk, DiskConfig, Result};
//!
//! # fn main() -> Result<()> {
//! let mut disk = Disk::new(DiskConfig::default())?;
//!
//! // Scatter a file, then pull it back together
//! disk.fragment_write("server.log", b"LOG_START. Connect. OK. Disconnect.", 8)?;
//! let extents = disk.defragment("server.log")?;
//! assert!(extents.is_contiguous());
//!
//! assert_eq!(disk.read("server.log")?, b"LOG_START. Connect. OK. Disconnect.");
//! # Ok(())
//! # }
//! ```
//!
//! ## Versioning
//!
//! ```rust
//! use planet_disk::{Digest, DiskBuilder, FixedClock, Result};
//!
//! # fn main() -> Result<()> {
//! let mut disk = DiskBuilder::new().commit_log(100, 5).build()?;
//! let clock = FixedClock::from_unix(1_700_000_000);
//!
//! disk.write("server.py", b"v1.0")?;
//! disk.commit("server.py", b"v1.1", "admin", "update", &clock)?;
//! disk.rollback("server.py", &Digest::of_payload(b"v1.0"))?;
//!
//! assert_eq!(disk.read("server.py")?, b"v1.0");
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core types that users need
pub use crate::core::{
    allocation::{AllocationTable, ExtentList, Run},
    backup::{BackupRecord, BackupReport},
    collapse::CollapseReport,
    commit_log::CommitRecord,
    compactor::CompactionReport,
    config::{BackupConfig, CommitLogConfig, CompactionPolicy, DiskConfig},
    digest::{Clock, Digest, FixedClock, SystemClock},
    disk::{Disk, DiskStats},
    error::{DiskError, Result},
    sector::{SectorAddress, SectorDevice, SectorRange, SectorStore},
    shared::SharedDisk,
};

use std::path::Path;
use tracing::{debug, info};

/// Builder for creating a [`Disk`] with custom configuration
///
/// # Examples
///
/// ```rust
/// use planet_disk::{CompactionPolicy, DiskBuilder};
///
/// # fn main() -> planet_disk::Result<()> {
/// let disk = DiskBuilder::new()
///     .sector_size(256)
///     .fragment_stride(3)
///     .compaction(CompactionPolicy::PreserveCount)
///     .snapshot_on_rollback()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DiskBuilder {
    config: DiskConfig,
}

impl DiskBuilder {
    /// Create a new DiskBuilder with default settings
    pub fn new() -> Self {
        DiskBuilder {
            config: DiskConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: DiskConfig) -> Self {
        DiskBuilder { config }
    }

    /// Start from a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = DiskConfig::load(path.as_ref())?;
        debug!("Loaded disk configuration from {:?}", path.as_ref());
        Ok(DiskBuilder { config })
    }

    /// Chunk size for plain writes
    pub fn sector_size(mut self, size: usize) -> Self {
        self.config.sector_size = size;
        self
    }

    /// Initial free-sector cursor
    pub fn first_free_sector(mut self, address: SectorAddress) -> Self {
        self.config.first_free_sector = address;
        self
    }

    /// Gap left before an automatically placed fragmented file
    pub fn fragment_gap(mut self, gap: u64) -> Self {
        self.config.fragment_gap = gap;
        self
    }

    /// Distance between fragments (must be greater than 1)
    pub fn fragment_stride(mut self, stride: u64) -> Self {
        self.config.fragment_stride = stride;
        self
    }

    /// Commit log ring location and size
    pub fn commit_log(mut self, base: SectorAddress, slots: u64) -> Self {
        self.config.commit_log = CommitLogConfig { base, slots };
        self
    }

    /// Boot sector range wiped by collapse
    pub fn boot_sectors(mut self, start: SectorAddress, len: u64) -> Self {
        self.config.boot_sectors = SectorRange::new(start, len);
        self
    }

    /// Backup region location and size
    pub fn backup_region(mut self, base: SectorAddress, slots: u64) -> Self {
        self.config.backup = BackupConfig { base, slots };
        self
    }

    pub fn compaction(mut self, policy: CompactionPolicy) -> Self {
        self.config.compaction = policy;
        self
    }

    /// Archive the discarded payload on every rollback
    pub fn snapshot_on_rollback(mut self) -> Self {
        self.config.snapshot_on_rollback = true;
        self
    }

    /// Build the Disk instance
    pub fn build(self) -> Result<Disk> {
        info!(
            "Building disk with sector size {}, fragment stride {}",
            self.config.sector_size, self.config.fragment_stride
        );
        Disk::new(self.config)
    }

    /// Build a lock-protected handle
    pub fn build_shared(self) -> Result<SharedDisk> {
        Ok(SharedDisk::new(self.build()?))
    }
}

impl Default for DiskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
