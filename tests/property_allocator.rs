//! Property-based tests for allocator correctness
//!
//! Uses proptest to verify placement invariants hold across many random scenarios

use planet_disk::{CompactionPolicy, Digest, DiskBuilder, ExtentList, FixedClock};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn prop_fragmentation_round_trip(
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        fragment_size in 1usize..128,
    ) {
        let mut disk = DiskBuilder::new().build().unwrap();

        let extents = disk.fragment_write("file.bin", &payload, fragment_size).unwrap();

        let expected = (payload.len() + fragment_size - 1) / fragment_size;
        prop_assert_eq!(extents.len(), expected);
        prop_assert_eq!(disk.read("file.bin").unwrap(), payload);
    }

    #[test]
    fn prop_compaction_preserves_content_and_is_contiguous(
        payload in prop::collection::vec(any::<u8>(), 1..2048),
        fragment_size in 1usize..64,
        base in 1000u64..5000,
        preserve_count in any::<bool>(),
    ) {
        let policy = if preserve_count {
            CompactionPolicy::PreserveCount
        } else {
            CompactionPolicy::MaxFragmentSize { size: 100 }
        };
        let mut disk = DiskBuilder::new().compaction(policy).build().unwrap();

        disk.fragment_write("file.bin", &payload, fragment_size).unwrap();
        let before = disk.read("file.bin").unwrap();

        let extents = disk.compact("file.bin", base).unwrap();

        prop_assert_eq!(&extents, &ExtentList::contiguous(base, extents.len()).unwrap());
        prop_assert!(extents.is_contiguous());
        prop_assert_eq!(disk.read("file.bin").unwrap(), before);
    }

    #[test]
    fn prop_no_sector_shared_between_files(
        sizes in prop::collection::vec((0usize..600, 1usize..64, any::<bool>()), 1..20)
    ) {
        let mut disk = DiskBuilder::new().sector_size(64).build().unwrap();

        for (idx, (size, fragment_size, fragmented)) in sizes.iter().enumerate() {
            let data = vec![idx as u8; *size];
            let name = format!("file{}.bin", idx);
            if *fragmented {
                disk.fragment_write(&name, &data, *fragment_size).unwrap();
            } else {
                disk.write(&name, &data).unwrap();
            }
        }

        let mut seen = HashSet::new();
        for (idx, (size, _, _)) in sizes.iter().enumerate() {
            let name = format!("file{}.bin", idx);
            for &address in disk.extents_of(&name).unwrap().iter() {
                prop_assert!(seen.insert(address), "sector {} allocated twice", address);
                prop_assert!(!(100..105).contains(&address));
                prop_assert!(!(500..564).contains(&address));
            }
            let data = disk.read(&name).unwrap();
            prop_assert_eq!(data.len(), *size);
            prop_assert!(data.iter().all(|&b| b == idx as u8), "file{} corrupted", idx);
        }
    }

    #[test]
    fn prop_commit_then_rollback_is_inverse(
        original in prop::collection::vec(any::<u8>(), 0..512),
        update in prop::collection::vec(any::<u8>(), 0..512),
        secs in 0i64..2_000_000_000,
    ) {
        let mut disk = DiskBuilder::new().build().unwrap();
        let clock = FixedClock::from_unix(secs);

        disk.write("file.bin", &original).unwrap();
        disk.commit("file.bin", &update, "author", "message", &clock).unwrap();
        prop_assert_eq!(disk.read("file.bin").unwrap(), update);

        disk.rollback("file.bin", &Digest::of_payload(&original)).unwrap();
        prop_assert_eq!(disk.read("file.bin").unwrap(), original);
    }
}
