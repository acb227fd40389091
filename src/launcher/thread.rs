//! Thread launcher
//!
//! One named OS thread per worker. Each thread reports its completion over a
//! crossbeam channel, so `await_any()` wakes up for whichever worker finishes
//! first and then joins exactly that thread.
//!
//! Execution ids are pthread ids: the parent reads them from the join handle,
//! the worker from `pthread_self()`, and both agree.

use super::{nothing_outstanding, WorkerBody, WorkerExit, WorkerHandle, WorkerLauncher, WorkerStatus};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::io;
use std::os::unix::thread::JoinHandleExt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

struct Completion {
    execution_id: u64,
    status: WorkerStatus,
}

/// Launches workers as OS threads
pub struct ThreadLauncher {
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    running: HashMap<u64, (usize, JoinHandle<()>)>,
}

impl ThreadLauncher {
    pub fn new() -> Self {
        let (completions_tx, completions_rx) = unbounded();
        Self {
            completions_tx,
            completions_rx,
            running: HashMap::new(),
        }
    }
}

impl Default for ThreadLauncher {
    fn default() -> Self {
        Self::new()
    }
}

fn current_thread_id() -> u64 {
    unsafe { libc::pthread_self() as u64 }
}

impl WorkerLauncher for ThreadLauncher {
    fn spawn(&mut self, work_page: usize, body: WorkerBody) -> io::Result<WorkerHandle> {
        let tx = self.completions_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("worker-{}", work_page))
            .spawn(move || {
                let execution_id = current_thread_id();
                let status = match panic::catch_unwind(AssertUnwindSafe(|| body(execution_id))) {
                    Ok(outcome) => WorkerStatus::from_outcome(&outcome),
                    Err(_) => WorkerStatus::Panicked,
                };
                // Receiver lives as long as the launcher, which outlives every worker
                let _ = tx.send(Completion { execution_id, status });
            })?;

        let execution_id = handle.as_pthread_t() as u64;
        self.running.insert(execution_id, (work_page, handle));

        Ok(WorkerHandle {
            work_page,
            execution_id,
        })
    }

    fn await_any(&mut self) -> io::Result<WorkerExit> {
        if self.running.is_empty() {
            return Err(nothing_outstanding());
        }

        let completion = self
            .completions_rx
            .recv()
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;

        let (work_page, handle) = self
            .running
            .remove(&completion.execution_id)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("completion from unknown worker thread {}", completion.execution_id),
                )
            })?;

        let status = match handle.join() {
            Ok(()) => completion.status,
            Err(_) => WorkerStatus::Panicked,
        };
        debug!(work_page, execution_id = completion.execution_id, %status, "joined worker thread");

        Ok(WorkerExit {
            execution_id: completion.execution_id,
            work_page,
            status,
        })
    }

    fn outstanding(&self) -> usize {
        self.running.len()
    }

    fn name(&self) -> &'static str {
        "thread"
    }
}

impl Drop for ThreadLauncher {
    fn drop(&mut self) {
        for (execution_id, (work_page, handle)) in self.running.drain() {
            warn!(work_page, execution_id, "joining worker thread left unreaped");
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerOutcome;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_spawn_and_reap() {
        let mut launcher = ThreadLauncher::new();
        let handle = launcher
            .spawn(1, Box::new(|_| WorkerOutcome::Completed))
            .unwrap();
        assert_eq!(handle.work_page, 1);
        assert_eq!(launcher.outstanding(), 1);

        let exit = launcher.await_any().unwrap();
        assert_eq!(exit.work_page, 1);
        assert_eq!(exit.execution_id, handle.execution_id);
        assert_eq!(exit.status, WorkerStatus::Succeeded);
        assert_eq!(launcher.outstanding(), 0);
    }

    #[test]
    fn test_body_sees_parent_execution_id() {
        let mut launcher = ThreadLauncher::new();
        let (tx, rx) = unbounded();
        let handle = launcher
            .spawn(
                1,
                Box::new(move |id| {
                    tx.send(id).unwrap();
                    WorkerOutcome::Completed
                }),
            )
            .unwrap();
        launcher.await_any().unwrap();
        assert_eq!(rx.recv().unwrap(), handle.execution_id);
    }

    #[test]
    fn test_panic_and_failure_are_reaped() {
        let mut launcher = ThreadLauncher::new();
        launcher
            .spawn(1, Box::new(|_| -> WorkerOutcome { panic!("boom") }))
            .unwrap();
        launcher
            .spawn(2, Box::new(|_| WorkerOutcome::Failed("bad row".into())))
            .unwrap();

        let mut exits: Vec<WorkerExit> = (0..2).map(|_| launcher.await_any().unwrap()).collect();
        exits.sort_by_key(|e| e.work_page);
        assert_eq!(exits[0].status, WorkerStatus::Panicked);
        assert_eq!(exits[1].status, WorkerStatus::Failed { code: 1 });
    }

    #[test]
    fn test_workers_run_concurrently() {
        // Every worker waits for all the others; this deadlocks unless they overlap
        let workers = 4;
        let barrier = Arc::new(Barrier::new(workers));
        let mut launcher = ThreadLauncher::new();

        for page in 1..=workers {
            let barrier = Arc::clone(&barrier);
            launcher
                .spawn(
                    page,
                    Box::new(move |_| {
                        barrier.wait();
                        WorkerOutcome::Completed
                    }),
                )
                .unwrap();
        }

        for _ in 0..workers {
            assert!(launcher.await_any().unwrap().status.is_success());
        }
    }

    #[test]
    fn test_await_without_workers() {
        let mut launcher = ThreadLauncher::new();
        let err = launcher.await_any().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
