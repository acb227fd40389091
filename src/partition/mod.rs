//! Task range partitioning
//!
//! Splits the task id range `1..=total_task_count` into `worker_count`
//! contiguous, non-overlapping partitions. Every partition gets
//! `total_task_count / worker_count` tasks, and the last one also absorbs the
//! remainder of the division.
//!
//! # Open-ended last partition
//!
//! The record set being processed may grow while the batch runs (rows inserted
//! after the count was taken). The last partition is therefore flagged with
//! `is_last`, and handlers are expected to treat its upper bound as open, e.g.
//! `SELECT ... WHERE id >= start_id` instead of `BETWEEN start_id AND end_id`.
//!
//! # Example
//!
//! ```
//! use multiworker::partition::{partition_size, range_for};
//!
//! let size = partition_size(101, 4);
//! assert_eq!(size, 25);
//!
//! let last = range_for(4, 4, 101, size);
//! assert_eq!((last.start_id, last.end_id, last.is_last), (76, 101, true));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contiguous inclusive range of task ids assigned to one worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// 1-based worker slot this partition belongs to
    pub work_page: usize,
    /// First task id (inclusive)
    pub start_id: u64,
    /// Last task id (inclusive) as known when the batch started
    pub end_id: u64,
    /// Whether this is the final partition (absorbs the remainder)
    pub is_last: bool,
}

impl Partition {
    /// Number of task ids between `start_id` and `end_id` inclusive
    pub fn len(&self) -> u64 {
        if self.end_id < self.start_id {
            0
        } else {
            self.end_id - self.start_id + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `task_id` lies inside the partition's fixed bounds
    pub fn contains(&self, task_id: u64) -> bool {
        task_id >= self.start_id && task_id <= self.end_id
    }

    /// Whether the upper bound may be extended past `end_id` at execution time
    pub fn is_open_ended(&self) -> bool {
        self.is_last
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_last {
            write!(f, "#{} [{}..={}+]", self.work_page, self.start_id, self.end_id)
        } else {
            write!(f, "#{} [{}..={}]", self.work_page, self.start_id, self.end_id)
        }
    }
}

/// Number of tasks per worker, truncated
///
/// Returns 0 for `worker_count == 0`; configurations like that are rejected by
/// validation before any partition is computed.
pub fn partition_size(total_task_count: u64, worker_count: usize) -> u64 {
    if worker_count == 0 {
        return 0;
    }
    total_task_count / worker_count as u64
}

/// Compute the partition for one worker slot
///
/// # Arguments
///
/// * `work_page` - 1-based worker slot, in `1..=worker_count`
/// * `worker_count` - Total number of workers
/// * `total_task_count` - Number of tasks counted before the run
/// * `partition_size` - Result of [`partition_size`] for the same counts
///
/// A `work_page` outside `1..=worker_count` is clamped to the nearest slot.
pub fn range_for(
    work_page: usize,
    worker_count: usize,
    total_task_count: u64,
    partition_size: u64,
) -> Partition {
    let worker_count = worker_count.max(1);
    let work_page = work_page.clamp(1, worker_count);

    let page = work_page as u64;
    let start_id = (page - 1) * partition_size + 1;

    if work_page == worker_count {
        Partition {
            work_page,
            start_id,
            end_id: total_task_count,
            is_last: true,
        }
    } else {
        Partition {
            work_page,
            start_id,
            end_id: page * partition_size,
            is_last: false,
        }
    }
}

/// All partitions for a run, in slot order
pub fn partitions(total_task_count: u64, worker_count: usize) -> Vec<Partition> {
    let size = partition_size(total_task_count, worker_count);
    (1..=worker_count)
        .map(|work_page| range_for(work_page, worker_count, total_task_count, size))
        .collect()
}
