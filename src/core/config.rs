//! Store configuration
//!
//! Every field has a default, so a TOML file only needs to name what it
//! changes:
//!
//! ```toml
//! sector_size = 256
//! fragment_stride = 3
//!
//! [commit_log]
//! base = 200
//! slots = 8
//!
//! [compaction]
//! policy = "preserve-count"
//! ```

use crate::core::error::{DiskError, Result};
use crate::core::sector::{SectorAddress, SectorRange};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Commit log placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitLogConfig {
    /// First commit log sector
    pub base: SectorAddress,
    /// Ring size K
    pub slots: u64,
}

impl Default for CommitLogConfig {
    fn default() -> Self {
        CommitLogConfig { base: 100, slots: 5 }
    }
}

impl CommitLogConfig {
    pub fn range(&self) -> SectorRange {
        SectorRange::new(self.base, self.slots)
    }
}

/// Backup region placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// First backup sector
    pub base: SectorAddress,
    /// Number of backup records the region holds
    pub slots: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig { base: 500, slots: 64 }
    }
}

impl BackupConfig {
    pub fn range(&self) -> SectorRange {
        SectorRange::new(self.base, self.slots)
    }
}

/// How the compactor sizes the fragments it rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum CompactionPolicy {
    /// Re-derive the size as `total_len / extent_count` (at least 1)
    PreserveCount,
    /// Fewest extents of at most `size` bytes
    MaxFragmentSize { size: usize },
}

impl CompactionPolicy {
    /// Fragment size to use for a payload of `total_len` bytes spread over `extent_count` sectors
    pub fn fragment_size(&self, total_len: usize, extent_count: usize) -> usize {
        match *self {
            CompactionPolicy::PreserveCount => {
                if extent_count == 0 {
                    1
                } else {
                    (total_len / extent_count).max(1)
                }
            }
            CompactionPolicy::MaxFragmentSize { size } => size,
        }
    }
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        CompactionPolicy::MaxFragmentSize {
            size: DEFAULT_SECTOR_SIZE,
        }
    }
}

const DEFAULT_SECTOR_SIZE: usize = 512;

/// Disk configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Chunk size for plain contiguous writes
    pub sector_size: usize,

    /// Initial free-sector cursor
    pub first_free_sector: SectorAddress,

    /// Distance left between the cursor and an automatically placed fragmented file
    pub fragment_gap: u64,

    /// Distance between consecutive fragments (must be > 1)
    pub fragment_stride: u64,

    /// Archive the discarded payload before a rollback overwrites it
    pub snapshot_on_rollback: bool,

    /// Commit log ring
    pub commit_log: CommitLogConfig,

    /// Low-address range zeroed by collapse alongside the commit log
    pub boot_sectors: SectorRange,

    /// Backup region
    pub backup: BackupConfig,

    /// Compaction sizing policy
    pub compaction: CompactionPolicy,
}

impl Default for DiskConfig {
    fn default() -> Self {
        DiskConfig {
            sector_size: DEFAULT_SECTOR_SIZE,
            first_free_sector: 1,
            fragment_gap: 10,
            fragment_stride: 5,
            snapshot_on_rollback: false,
            commit_log: CommitLogConfig::default(),
            boot_sectors: SectorRange::new(1, 3),
            backup: BackupConfig::default(),
            compaction: CompactionPolicy::default(),
        }
    }
}

impl DiskConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: DiskConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DiskError::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 {
            return Err(DiskError::InvalidConfig(
                "sector_size must be greater than 0".to_string(),
            ));
        }

        if self.fragment_stride < 2 {
            return Err(DiskError::InvalidConfig(format!(
                "fragment_stride must be greater than 1 (got {})",
                self.fragment_stride
            )));
        }

        if self.commit_log.slots == 0 {
            return Err(DiskError::InvalidConfig(
                "commit_log.slots must be greater than 0".to_string(),
            ));
        }

        if let CompactionPolicy::MaxFragmentSize { size: 0 } = self.compaction {
            return Err(DiskError::InvalidConfig(
                "compaction size must be greater than 0".to_string(),
            ));
        }

        for (name, range) in [("commit_log", self.commit_log.range()), ("backup", self.backup.range())] {
            if range.start.checked_add(range.len).is_none() {
                return Err(DiskError::InvalidConfig(format!(
                    "{} region runs past the end of the address space",
                    name
                )));
            }
        }

        if self.commit_log.range().overlaps(&self.backup.range()) {
            return Err(DiskError::InvalidConfig(
                "commit log and backup region overlap".to_string(),
            ));
        }

        if self.boot_sectors.overlaps(&self.backup.range()) {
            return Err(DiskError::InvalidConfig(
                "boot sectors and backup region overlap".to_string(),
            ));
        }

        Ok(())
    }

    /// Ranges the free-sector cursor never hands out
    pub fn reserved_ranges(&self) -> Vec<SectorRange> {
        vec![self.commit_log.range(), self.backup.range()]
    }

    /// Addresses wiped by collapse: the commit log plus the boot sectors
    pub fn critical_sectors(&self) -> Vec<SectorAddress> {
        let mut critical: Vec<SectorAddress> = self
            .boot_sectors
            .addresses()
            .chain(self.commit_log.range().addresses())
            .collect();
        critical.sort_unstable();
        critical.dedup();
        critical
    }
}
