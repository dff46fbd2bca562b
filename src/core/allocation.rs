//! Allocation table: file id → ordered extent list
//!
//! The table is the single source of truth for where a file lives. It keeps a
//! reverse owner index so placement can tell whether an address already backs
//! another file.

use crate::core::error::{DiskError, Result};
use crate::core::sector::SectorAddress;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A contiguous run of sector addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// First address of the run
    pub start: SectorAddress,
    /// Number of consecutive addresses
    pub length: u64,
}

impl Run {
    pub fn new(start: SectorAddress, length: u64) -> Self {
        Run { start, length }
    }

    /// Check if this run contains an address
    pub fn contains(&self, address: SectorAddress) -> bool {
        address >= self.start && address - self.start < self.length
    }

    /// Check if `other` starts exactly where this run ends
    pub fn is_followed_by(&self, other: &Run) -> bool {
        self.start.checked_add(self.length) == Some(other.start)
    }

    /// Merge a directly following run into this one
    pub fn coalesce(&self, other: &Run) -> Option<Run> {
        if !self.is_followed_by(other) {
            return None;
        }

        Some(Run {
            start: self.start,
            length: self.length + other.length,
        })
    }
}

/// Ordered sector addresses belonging to one file
///
/// Addresses are unique within a list and are read in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentList(Vec<SectorAddress>);

impl ExtentList {
    pub fn new(addresses: Vec<SectorAddress>) -> Self {
        debug_assert!(
            {
                let mut seen = std::collections::HashSet::new();
                addresses.iter().all(|a| seen.insert(*a))
            },
            "extent list contains a duplicate address"
        );
        ExtentList(addresses)
    }

    /// Contiguous list `[start, start + 1, ..., start + len - 1]`
    ///
    /// Fails when the last address would not fit in a [`SectorAddress`].
    pub fn contiguous(start: SectorAddress, len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(ExtentList::default());
        }
        let last = start
            .checked_add(len as u64 - 1)
            .ok_or(DiskError::AddressOutOfRange { base: start, count: len })?;
        Ok(ExtentList((start..=last).collect()))
    }

    pub fn addresses(&self) -> &[SectorAddress] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectorAddress> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<SectorAddress> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<SectorAddress> {
        self.0.last().copied()
    }

    /// True when every address is exactly one past its predecessor
    pub fn is_contiguous(&self) -> bool {
        self.0.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]))
    }

    /// Group the list (in list order) into maximal ascending runs
    pub fn runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();

        for &address in &self.0 {
            let next = Run::new(address, 1);
            match runs.last_mut() {
                Some(last) => match last.coalesce(&next) {
                    Some(merged) => *last = merged,
                    None => runs.push(next),
                },
                None => runs.push(next),
            }
        }

        runs
    }

    /// Number of breaks between runs (0 = defragmented)
    pub fn fragment_count(&self) -> usize {
        self.runs().len().saturating_sub(1)
    }

    pub fn into_vec(self) -> Vec<SectorAddress> {
        self.0
    }
}

impl From<Vec<SectorAddress>> for ExtentList {
    fn from(addresses: Vec<SectorAddress>) -> Self {
        ExtentList::new(addresses)
    }
}

impl PartialEq<Vec<SectorAddress>> for ExtentList {
    fn eq(&self, other: &Vec<SectorAddress>) -> bool {
        &self.0 == other
    }
}

/// File id → extent list, with a reverse owner index
#[derive(Debug, Clone, Default)]
pub struct AllocationTable {
    entries: HashMap<String, ExtentList>,
    owners: BTreeMap<SectorAddress, String>,
}

impl AllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current extent list for a file
    pub fn get(&self, file: &str) -> Option<&ExtentList> {
        self.entries.get(file)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.entries.contains_key(file)
    }

    /// File whose extent list references `address`
    pub fn owner_of(&self, address: SectorAddress) -> Option<&str> {
        self.owners.get(&address).map(String::as_str)
    }

    /// True if `address` backs a file other than `file`
    pub fn owned_by_other(&self, address: SectorAddress, file: &str) -> Option<&str> {
        self.owner_of(address).filter(|owner| *owner != file)
    }

    /// Replace (or create) a file's entry, returning the previous list
    pub fn assign(&mut self, file: &str, extents: ExtentList) -> Option<ExtentList> {
        let previous = self.remove(file);

        for &address in extents.iter() {
            self.owners.insert(address, file.to_string());
        }
        self.entries.insert(file.to_string(), extents);

        previous
    }

    /// Drop a file's entry
    pub fn remove(&mut self, file: &str) -> Option<ExtentList> {
        let previous = self.entries.remove(file)?;
        for address in previous.iter() {
            if self.owners.get(address).map(String::as_str) == Some(file) {
                self.owners.remove(address);
            }
        }
        Some(previous)
    }

    /// Discard every entry, returning how many files were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.owners.clear();
        count
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtentList)> {
        self.entries.iter().map(|(file, extents)| (file.as_str(), extents))
    }

    /// File ids in sorted order
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries.keys().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_contains() {
        let run = Run::new(10, 20);
        assert!(!run.contains(9));
        assert!(run.contains(10));
        assert!(run.contains(29));
        assert!(!run.contains(30));
    }

    #[test]
    fn test_run_coalesce() {
        let r1 = Run::new(10, 10);
        let r2 = Run::new(20, 5);
        assert_eq!(r1.coalesce(&r2), Some(Run::new(10, 15)));
        assert_eq!(r2.coalesce(&r1), None);
    }

    #[test]
    fn test_runs_follow_list_order() {
        let list = ExtentList::new(vec![11, 16, 17, 18, 3, 4]);
        assert_eq!(
            list.runs(),
            vec![Run::new(11, 1), Run::new(16, 3), Run::new(3, 2)]
        );
        assert_eq!(list.fragment_count(), 2);
        assert!(!list.is_contiguous());
    }

    #[test]
    fn test_contiguous_list() {
        let list = ExtentList::contiguous(50, 4).unwrap();
        assert_eq!(list, vec![50, 51, 52, 53]);
        assert!(list.is_contiguous());
        assert_eq!(list.fragment_count(), 0);
        assert_eq!(ExtentList::default().fragment_count(), 0);
    }

    #[test]
    fn test_contiguous_at_top_of_address_space() {
        let list = ExtentList::contiguous(u64::MAX - 1, 2).unwrap();
        assert_eq!(list, vec![u64::MAX - 1, u64::MAX]);
        assert!(list.is_contiguous());
        assert_eq!(list.runs(), vec![Run::new(u64::MAX - 1, 2)]);

        assert!(matches!(
            ExtentList::contiguous(u64::MAX - 1, 3),
            Err(DiskError::AddressOutOfRange { count: 3, .. })
        ));
        assert!(!ExtentList::new(vec![u64::MAX, 0]).is_contiguous());
    }

    #[test]
    fn test_assign_replaces_and_tracks_owners() {
        let mut table = AllocationTable::new();
        table.assign("a.txt", ExtentList::new(vec![1, 3, 5]));
        assert_eq!(table.owner_of(3), Some("a.txt"));

        let previous = table.assign("a.txt", ExtentList::new(vec![7]));
        assert_eq!(previous, Some(ExtentList::new(vec![1, 3, 5])));
        assert_eq!(table.owner_of(3), None);
        assert_eq!(table.owner_of(7), Some("a.txt"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_owned_by_other() {
        let mut table = AllocationTable::new();
        table.assign("a", ExtentList::new(vec![1]));
        assert_eq!(table.owned_by_other(1, "a"), None);
        assert_eq!(table.owned_by_other(1, "b"), Some("a"));
        assert_eq!(table.owned_by_other(2, "b"), None);
    }

    #[test]
    fn test_clear() {
        let mut table = AllocationTable::new();
        table.assign("a", ExtentList::new(vec![1]));
        table.assign("b", ExtentList::new(vec![2]));
        assert_eq!(table.clear(), 2);
        assert!(table.is_empty());
        assert_eq!(table.owner_of(1), None);
    }

    #[test]
    fn test_empty_entry_is_present() {
        let mut table = AllocationTable::new();
        table.assign("empty", ExtentList::default());
        assert!(table.contains("empty"));
        assert!(table.get("empty").map(ExtentList::is_empty).unwrap_or(false));
    }
}
