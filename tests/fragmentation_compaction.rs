//! Fragmented writes followed by compaction
//!
//! Replays the server-log scenario: the log is scattered with a stride, then
//! compacted back into one contiguous run.

use planet_disk::{CompactionPolicy, DiskBuilder, DiskError, ExtentList};

const LOG: &[u8] =
    b"LOG_START. Server (teddy_server) received command: Connect. Status: OK. Disconnect.";
const LOG_FILE: &str = "C:/ProgramFiles/Teddy_Server/logs/teddy_server_log.txt";

#[test]
fn test_fragment_then_compact_preserve_count() {
    let mut disk = DiskBuilder::new()
        .fragment_stride(2)
        .compaction(CompactionPolicy::PreserveCount)
        .build()
        .unwrap();

    let fragmented = disk.fragment_write_at(LOG_FILE, LOG, 10, 10).unwrap();
    assert_eq!(fragmented, vec![10, 12, 14, 16, 18, 20, 22, 24, 26]);
    assert_eq!(fragmented.fragment_count(), 8);

    let compacted = disk.compact(LOG_FILE, 200).unwrap();

    // 83 / 9 = 9 bytes per fragment, which takes 10 fragments
    assert_eq!(compacted, ExtentList::contiguous(200, 10).unwrap());
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);
    for address in fragmented.iter() {
        assert!(disk.read_sector(*address).is_empty());
    }
    assert_eq!(disk.cursor(), 210);
}

#[test]
fn test_compact_with_max_fragment_size() {
    let mut disk = DiskBuilder::new()
        .compaction(CompactionPolicy::MaxFragmentSize { size: 32 })
        .build()
        .unwrap();

    disk.fragment_write(LOG_FILE, LOG, 10).unwrap();
    let compacted = disk.compact(LOG_FILE, 300).unwrap();

    assert_eq!(compacted, vec![300, 301, 302]);
    assert_eq!(disk.read_sector(302).len(), 83 - 64);
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);
}

#[test]
fn test_compact_past_end_of_address_space() {
    let mut disk = DiskBuilder::new()
        .fragment_stride(2)
        .compaction(CompactionPolicy::PreserveCount)
        .build()
        .unwrap();
    let fragmented = disk.fragment_write_at(LOG_FILE, LOG, 10, 10).unwrap();

    let result = disk.compact(LOG_FILE, u64::MAX - 1);
    assert!(matches!(result, Err(DiskError::AddressOutOfRange { .. })));
    assert_eq!(disk.extents_of(LOG_FILE).unwrap(), fragmented);
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);

    let result = disk.fragment_write_at(LOG_FILE, LOG, 10, u64::MAX - 4);
    assert!(matches!(result, Err(DiskError::AddressOutOfRange { .. })));
    assert_eq!(disk.extents_of(LOG_FILE).unwrap(), fragmented);
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);
}

#[test]
fn test_compact_unknown_file() {
    let mut disk = DiskBuilder::new().build().unwrap();
    assert!(matches!(
        disk.compact("missing.txt", 50),
        Err(DiskError::FileNotFound(_))
    ));
}

#[test]
fn test_compact_refuses_other_files_sectors() {
    let mut disk = DiskBuilder::new().build().unwrap();
    disk.write_at("other.txt", 60, b"keep me").unwrap();
    disk.fragment_write(LOG_FILE, LOG, 10).unwrap();
    let before = disk.extents_of(LOG_FILE).unwrap();

    let result = disk.compact(LOG_FILE, 60);

    assert!(matches!(
        result,
        Err(DiskError::SectorConflict { address: 60, .. })
    ));
    assert_eq!(disk.extents_of(LOG_FILE).unwrap(), before);
    assert_eq!(disk.read("other.txt").unwrap(), b"keep me");
}

#[test]
fn test_fragmented_placement_skips_commit_log() {
    let mut disk = DiskBuilder::new().fragment_stride(2).build().unwrap();

    let extents = disk.fragment_write_at(LOG_FILE, LOG, 10, 96);
    assert!(matches!(extents, Err(DiskError::ReservedSector(100))));
    assert!(!disk.exists(LOG_FILE));

    // Automatic placement never lands in the log range
    disk.write_at("pad", 85, b"x").unwrap();
    let extents = disk.fragment_write(LOG_FILE, LOG, 10).unwrap();
    assert!(extents.iter().all(|&a| !(100..105).contains(&a)));
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);
}

#[test]
fn test_empty_payload_fragment_write() {
    let mut disk = DiskBuilder::new().build().unwrap();

    let extents = disk.fragment_write("empty.log", b"", 10).unwrap();
    assert!(extents.is_empty());
    assert!(disk.exists("empty.log"));
    assert_eq!(disk.read("empty.log").unwrap(), b"");

    let compacted = disk.compact("empty.log", 40).unwrap();
    assert!(compacted.is_empty());
}

#[test]
fn test_refragmenting_releases_previous_sectors() {
    let mut disk = DiskBuilder::new().build().unwrap();

    let first = disk.fragment_write(LOG_FILE, LOG, 20).unwrap();
    let second = disk.fragment_write(LOG_FILE, b"short", 2).unwrap();

    for address in first.iter().filter(|a| !second.addresses().contains(*a)) {
        assert!(disk.read_sector(*address).is_empty());
    }
    assert_eq!(disk.read(LOG_FILE).unwrap(), b"short");
}

#[test]
fn test_defragment_stats() {
    let mut disk = DiskBuilder::new().build().unwrap();
    disk.fragment_write(LOG_FILE, LOG, 10).unwrap();
    assert_eq!(disk.stats().fragmented_files, 1);

    disk.defragment(LOG_FILE).unwrap();
    let stats = disk.stats();
    assert_eq!(stats.fragmented_files, 0);
    assert_eq!(stats.allocated_sectors, 1);
    assert_eq!(disk.read(LOG_FILE).unwrap(), LOG);
}
