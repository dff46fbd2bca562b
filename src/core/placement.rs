//! Address selection shared by writers and the compactor
//!
//! An address is free for `file` when it is not reserved and does not back
//! another file. Addresses the file itself already owns count as free, so a
//! rewrite may land on its own old sectors.

use crate::core::allocation::{AllocationTable, ExtentList};
use crate::core::error::{DiskError, Result};
use crate::core::sector::{SectorAddress, SectorDevice};

/// Whether `address` can be used for `file`
pub fn is_free<D: SectorDevice>(
    device: &D,
    table: &AllocationTable,
    file: &str,
    address: SectorAddress,
) -> bool {
    !device.is_reserved(address) && table.owned_by_other(address, file).is_none()
}

/// Fail with the first address that cannot be used for `file`
pub fn check_placement<D: SectorDevice>(
    device: &D,
    table: &AllocationTable,
    file: &str,
    addresses: &[SectorAddress],
) -> Result<()> {
    for &address in addresses {
        if device.is_reserved(address) {
            return Err(DiskError::ReservedSector(address));
        }
        if let Some(owner) = table.owned_by_other(address, file) {
            return Err(DiskError::SectorConflict {
                address,
                owner: owner.to_string(),
            });
        }
    }
    Ok(())
}

/// Addresses `base, base + stride, ..., base + (count - 1) * stride`
///
/// Fails when the last address would not fit in a [`SectorAddress`].
pub fn strided(base: SectorAddress, stride: u64, count: usize) -> Result<Vec<SectorAddress>> {
    (0..count as u64)
        .map(|i| {
            i.checked_mul(stride)
                .and_then(|offset| base.checked_add(offset))
                .ok_or(DiskError::AddressOutOfRange { base, count })
        })
        .collect()
}

/// Lowest base at or after `start` whose strided addresses are all free
///
/// Fails once no base left in the address space can hold `count` addresses.
pub fn find_strided<D: SectorDevice>(
    device: &D,
    table: &AllocationTable,
    file: &str,
    start: SectorAddress,
    stride: u64,
    count: usize,
) -> Result<SectorAddress> {
    let mut base = start;
    while !strided(base, stride, count)?
        .into_iter()
        .all(|address| is_free(device, table, file, address))
    {
        base = base
            .checked_add(1)
            .ok_or(DiskError::AddressOutOfRange { base, count })?;
    }
    Ok(base)
}

/// First contiguous run of `count` free addresses at or after the cursor
pub fn find_contiguous<D: SectorDevice>(
    device: &D,
    table: &AllocationTable,
    file: &str,
    count: usize,
) -> Result<SectorAddress> {
    find_strided(device, table, file, device.cursor(), 1, count)
}

/// Remove a file's entry and delete the sectors it referenced
pub fn release<D: SectorDevice>(
    device: &mut D,
    table: &mut AllocationTable,
    file: &str,
) -> Option<ExtentList> {
    let extents = table.remove(file)?;
    for &address in extents.iter() {
        device.delete_sector(address);
    }
    Some(extents)
}

/// Concatenate a file's sectors in extent-list order
pub fn reassemble<D: SectorDevice>(device: &D, extents: &ExtentList) -> Vec<u8> {
    let mut payload = Vec::new();
    for &address in extents.iter() {
        payload.extend_from_slice(device.read_sector(address));
    }
    payload
}
