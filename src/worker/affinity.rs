//! CPU affinity for workers
//!
//! Workers can be pinned to CPU cores from a configured list. Slot `k` gets
//! `cores[(k - 1) % cores.len()]`, so more workers than cores simply wrap
//! around the list.
//!
//! # Platform Support
//!
//! Pinning uses `sched_setaffinity` and is only available on Linux. In fork
//! mode it pins the whole worker process, in thread mode the worker thread.
//!
//! # Example
//!
//! ```
//! use multiworker::worker::affinity::{core_for_slot, parse_cpu_list};
//!
//! let cores = parse_cpu_list("0,2-3").unwrap();
//! assert_eq!(core_for_slot(&cores, 4), Some(0));
//! ```

use crate::Result;
use anyhow::Context;
use tracing::warn;

/// Pin the calling thread to a single CPU core
///
/// # Errors
///
/// Returns an error if the core id is out of range or the syscall fails
/// (e.g. the core is offline or outside the process's allowed set).
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    if core > crate::config::validator::MAX_CPU_CORE {
        anyhow::bail!("CPU core ID {} is too large (max {})", core, crate::config::validator::MAX_CPU_CORE);
    }

    let result = unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);
        CPU_SET(core, &mut cpu_set);

        sched_setaffinity(
            0, // 0 = calling thread
            mem::size_of::<cpu_set_t>(),
            &cpu_set,
        )
    };

    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).context(format!("Failed to pin worker to CPU core {}", core));
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(_core: usize) -> Result<()> {
    anyhow::bail!("CPU affinity is only supported on Linux")
}

/// Core assigned to a 1-based worker slot
pub fn core_for_slot(cores: &[usize], work_page: usize) -> Option<usize> {
    if cores.is_empty() || work_page == 0 {
        return None;
    }
    Some(cores[(work_page - 1) % cores.len()])
}

/// Parse a comma-separated list of CPU cores or ranges
///
/// Supports formats like:
/// - "0,1,2,3" - Individual cores
/// - "0-3" - Range of cores
/// - "0,2-4,7" - Mixed individual and ranges
///
/// The result is sorted and deduplicated.
pub fn parse_cpu_list(list: &str) -> Result<Vec<usize>> {
    let mut cores = Vec::new();

    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid CPU core number: {}", start))?;
                let end: usize = end
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid CPU core number: {}", end))?;

                if start > end {
                    anyhow::bail!("Invalid CPU range: start ({}) > end ({})", start, end);
                }
                cores.extend(start..=end);
            }
            None => {
                let core: usize = part
                    .parse()
                    .with_context(|| format!("Invalid CPU core number: {}", part))?;
                cores.push(core);
            }
        }
    }

    if cores.is_empty() {
        anyhow::bail!("CPU core list cannot be empty");
    }

    cores.sort_unstable();
    cores.dedup();

    Ok(cores)
}

/// Warn when more workers are configured than the machine has cores
///
/// Returns true if the run is oversubscribed.
pub fn warn_if_oversubscribed(worker_count: usize) -> bool {
    let cpu_count = num_cpus::get();
    if worker_count > cpu_count {
        warn!(
            worker_count,
            cpu_count, "worker count exceeds CPU count, workers will share cores"
        );
        true
    } else {
        false
    }
}
