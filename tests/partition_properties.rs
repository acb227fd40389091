//! Property tests for task range partitioning

use multiworker::partition::{partition_size, partitions, range_for};
use proptest::prelude::*;

/// (total_task_count, worker_count) with total >= workers >= 1
fn counts_strategy() -> impl Strategy<Value = (u64, usize)> {
    (1usize..=64).prop_flat_map(|workers| ((workers as u64)..=5_000u64, Just(workers)))
}

proptest! {
    /// Property: partitions cover 1..=total exactly, in order, without overlap
    #[test]
    fn partitions_cover_range_exactly((total, workers) in counts_strategy()) {
        let parts = partitions(total, workers);
        prop_assert_eq!(parts.len(), workers);
        prop_assert_eq!(parts[0].start_id, 1);
        prop_assert_eq!(parts[workers - 1].end_id, total);

        for pair in parts.windows(2) {
            prop_assert_eq!(pair[1].start_id, pair[0].end_id + 1);
        }

        let covered: u64 = parts.iter().map(|p| p.len()).sum();
        prop_assert_eq!(covered, total);
    }

    /// Property: no partition is empty when total >= workers
    #[test]
    fn partitions_are_never_empty((total, workers) in counts_strategy()) {
        for part in partitions(total, workers) {
            prop_assert!(part.start_id <= part.end_id, "empty partition {:?}", part);
        }
    }

    /// Property: exactly one partition is last, and it is the final slot
    #[test]
    fn exactly_one_last_partition((total, workers) in counts_strategy()) {
        let parts = partitions(total, workers);
        let last: Vec<_> = parts.iter().filter(|p| p.is_last).collect();
        prop_assert_eq!(last.len(), 1);
        prop_assert_eq!(last[0].work_page, workers);
    }

    /// Property: size * workers <= total < size * workers + workers
    #[test]
    fn partition_size_remainder_bound((total, workers) in counts_strategy()) {
        let size = partition_size(total, workers);
        let workers = workers as u64;
        prop_assert!(size * workers <= total);
        prop_assert!(total < size * workers + workers);
    }

    /// Property: range_for is a pure function of its inputs
    #[test]
    fn range_for_is_pure((total, workers) in counts_strategy(), seed in any::<usize>()) {
        let page = seed % workers + 1;
        let size = partition_size(total, workers);
        prop_assert_eq!(
            range_for(page, workers, total, size),
            range_for(page, workers, total, size)
        );
    }
}
