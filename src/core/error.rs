use crate::core::sector::SectorAddress;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Target version {digest} not found for {file}")]
    TargetVersionNotFound { file: String, digest: String },

    #[error("Invalid fragment size: {0} (must be greater than 0)")]
    InvalidFragmentSize(usize),

    #[error("Invalid file id: {0:?} (must be non-empty)")]
    InvalidFileId(String),

    #[error("{count} sectors from {base} run past the end of the address space")]
    AddressOutOfRange { base: SectorAddress, count: usize },

    #[error("Sector {0} is reserved")]
    ReservedSector(SectorAddress),

    #[error("Sector {address} is already allocated to {owner}")]
    SectorConflict {
        address: SectorAddress,
        owner: String,
    },

    #[error("Backup region full: {needed} records requested, {capacity} slots available")]
    BackupRegionFull { needed: usize, capacity: usize },

    #[error("No backup record found for {0}")]
    BackupNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiskError>;
