//! Mock launcher for testing
//!
//! Runs each worker body synchronously inside `spawn()` and queues its exit
//! for `await_any()`. No processes or threads are created, which makes
//! coordinator tests fast and deterministic.
//!
//! # Features
//!
//! - Counts spawn attempts and reaps
//! - Injects a spawn failure at a chosen worker slot
//! - Fails a number of `await_any()` calls without losing the pending exit
//! - Optionally reports completions in reverse spawn order
//!
//! Clones share state, so a test can hand one clone to the coordinator and
//! inspect the other afterwards.
//!
//! # Example
//!
//! ```
//! use multiworker::launcher::mock::MockLauncher;
//! use multiworker::launcher::WorkerLauncher;
//! use multiworker::worker::WorkerOutcome;
//!
//! let mut launcher = MockLauncher::new();
//! launcher.spawn(1, Box::new(|_| WorkerOutcome::Completed)).unwrap();
//! let exit = launcher.await_any().unwrap();
//! assert_eq!(exit.work_page, 1);
//! assert_eq!(launcher.spawn_calls(), 1);
//! assert_eq!(launcher.reap_calls(), 1);
//! ```

use super::{nothing_outstanding, WorkerBody, WorkerExit, WorkerHandle, WorkerLauncher, WorkerStatus};
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// First execution id handed out by the mock
pub const MOCK_EXECUTION_ID_BASE: u64 = 10_000;

/// In-process launcher for tests
#[derive(Clone, Default)]
pub struct MockLauncher {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    fail_spawn_at: Option<usize>,
    failing_reaps: usize,
    reverse_completion: bool,
    spawn_calls: usize,
    reap_calls: usize,
    spawned_pages: Vec<usize>,
    pending: VecDeque<WorkerExit>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the spawn of `work_page` fail with `WouldBlock` (like fork's EAGAIN)
    pub fn fail_spawn_at(self, work_page: usize) -> Self {
        self.state.lock().unwrap().fail_spawn_at = Some(work_page);
        self
    }

    /// Make the next `count` calls to `await_any()` fail; exits stay queued
    pub fn fail_reaps(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_reaps = count;
        self
    }

    /// Report completions last-spawned-first
    pub fn complete_in_reverse(self) -> Self {
        self.state.lock().unwrap().reverse_completion = true;
        self
    }

    /// Spawn attempts, including a failed one
    pub fn spawn_calls(&self) -> usize {
        self.state.lock().unwrap().spawn_calls
    }

    /// Calls to `await_any()`
    pub fn reap_calls(&self) -> usize {
        self.state.lock().unwrap().reap_calls
    }

    /// Slots of successfully spawned workers, in spawn order
    pub fn spawned_pages(&self) -> Vec<usize> {
        self.state.lock().unwrap().spawned_pages.clone()
    }
}

impl WorkerLauncher for MockLauncher {
    fn spawn(&mut self, work_page: usize, body: WorkerBody) -> io::Result<WorkerHandle> {
        let execution_id = {
            let mut state = self.state.lock().unwrap();
            state.spawn_calls += 1;

            if state.fail_spawn_at == Some(work_page) {
                return Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "mock spawn failure: resource temporarily unavailable",
                ));
            }

            state.spawned_pages.push(work_page);
            MOCK_EXECUTION_ID_BASE + state.spawned_pages.len() as u64
        };

        // Run outside the lock so bodies may inspect the launcher
        let status = match panic::catch_unwind(AssertUnwindSafe(|| body(execution_id))) {
            Ok(outcome) => WorkerStatus::from_outcome(&outcome),
            Err(_) => WorkerStatus::Panicked,
        };

        self.state.lock().unwrap().pending.push_back(WorkerExit {
            execution_id,
            work_page,
            status,
        });

        Ok(WorkerHandle {
            work_page,
            execution_id,
        })
    }

    fn await_any(&mut self) -> io::Result<WorkerExit> {
        let mut state = self.state.lock().unwrap();
        state.reap_calls += 1;

        if state.failing_reaps > 0 && !state.pending.is_empty() {
            state.failing_reaps -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "mock reap failure"));
        }

        let next = if state.reverse_completion {
            state.pending.pop_back()
        } else {
            state.pending.pop_front()
        };
        next.ok_or_else(nothing_outstanding)
    }

    fn outstanding(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
