//! Core implementation: sectors, allocation, fragmentation, versioning

pub mod allocation;
pub mod backup;
pub mod collapse;
pub mod commit_log;
pub mod compactor;
pub mod config;
pub mod digest;
pub mod disk;
pub mod error;
pub mod fragment;
pub mod placement;
pub mod sector;
pub mod shared;
pub mod version;

pub use disk::{Disk, DiskStats};
pub use shared::SharedDisk;
