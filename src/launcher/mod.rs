//! Worker launch abstraction
//!
//! This module defines the capability set the coordinator needs from its
//! concurrency substrate: start an isolated unit of execution, and block until
//! any previously started unit has terminated.
//!
//! # Launchers
//!
//! - **fork**: one child process per worker (`fork` + `waitpid`). The handler
//!   runs in a copy of the parent's address space and cannot corrupt it.
//! - **thread**: one named OS thread per worker, completions delivered over a
//!   channel. Lower overhead, no isolation.
//! - **mock**: runs bodies in-process with spawn-failure injection, for tests.
//!
//! # Lifecycle
//!
//! 1. `spawn()` once per worker; returns immediately in the parent
//! 2. `await_any()` once per successful spawn; each call reaps exactly one
//!    worker, in completion order
//!
//! Launchers own whatever OS bookkeeping a worker needs (join handles, pids)
//! and release it in `await_any()`.

pub mod fork;
pub mod mock;
pub mod thread;

use crate::config::LaunchMode;
use crate::worker::WorkerOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Exit code of a forked worker whose body panicked
pub const PANIC_EXIT_CODE: i32 = 101;

/// Code run inside a worker
///
/// Receives the worker's execution id (pid or pthread id) and returns how it
/// ended. Panics are caught by the launcher.
pub type WorkerBody = Box<dyn FnOnce(u64) -> WorkerOutcome + Send + 'static>;

/// Parent-side record of a spawned worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerHandle {
    pub work_page: usize,
    pub execution_id: u64,
}

/// A reaped worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub execution_id: u64,
    pub work_page: usize,
    pub status: WorkerStatus,
}

/// Termination status of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Handler returned Ok
    Succeeded,
    /// Handler returned Err, or a forked worker exited non-zero
    Failed { code: i32 },
    /// Worker body panicked; for a forked worker, any exit with code 101,
    /// including a handler calling `process::exit(101)` itself
    Panicked,
    /// Forked worker was killed by a signal
    Signaled { signal: i32 },
}

impl WorkerStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkerStatus::Succeeded)
    }

    pub(crate) fn from_outcome(outcome: &WorkerOutcome) -> Self {
        match outcome {
            WorkerOutcome::Completed => WorkerStatus::Succeeded,
            WorkerOutcome::Failed(_) => WorkerStatus::Failed { code: outcome.exit_code() },
        }
    }

    /// Map a forked worker's exit code; 101 always reads as a panic
    pub(crate) fn from_exit_code(code: i32) -> Self {
        match code {
            0 => WorkerStatus::Succeeded,
            PANIC_EXIT_CODE => WorkerStatus::Panicked,
            code => WorkerStatus::Failed { code },
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Succeeded => write!(f, "ok"),
            WorkerStatus::Failed { code } => write!(f, "failed (code {})", code),
            WorkerStatus::Panicked => write!(f, "panicked"),
            WorkerStatus::Signaled { signal } => write!(f, "killed by signal {}", signal),
        }
    }
}

/// Worker launch substrate
///
/// Launchers are used from the parent only and need not be `Sync`.
pub trait WorkerLauncher {
    /// Start a new worker running `body`
    ///
    /// Must not wait for the body to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot create a new execution unit
    /// (e.g. `EAGAIN` from fork, thread creation failure).
    fn spawn(&mut self, work_page: usize, body: WorkerBody) -> io::Result<WorkerHandle>;

    /// Block until one outstanding worker has terminated, and reap it
    ///
    /// # Errors
    ///
    /// Returns an error if no worker is outstanding or the wait itself fails.
    fn await_any(&mut self) -> io::Result<WorkerExit>;

    /// Number of spawned workers not yet reaped
    fn outstanding(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Create the launcher for a launch mode
pub fn create_launcher(mode: LaunchMode) -> Box<dyn WorkerLauncher> {
    match mode {
        LaunchMode::Fork => Box::new(fork::ForkLauncher::new()),
        LaunchMode::Thread => Box::new(thread::ThreadLauncher::new()),
    }
}

/// Error for `await_any()` with nothing to wait for
pub(crate) fn nothing_outstanding() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "no outstanding workers to reap")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_exit_code() {
        assert_eq!(WorkerStatus::from_exit_code(0), WorkerStatus::Succeeded);
        assert_eq!(WorkerStatus::from_exit_code(1), WorkerStatus::Failed { code: 1 });
        assert_eq!(WorkerStatus::from_exit_code(PANIC_EXIT_CODE), WorkerStatus::Panicked);
    }

    #[test]
    fn test_status_from_outcome() {
        assert!(WorkerStatus::from_outcome(&WorkerOutcome::Completed).is_success());
        assert_eq!(
            WorkerStatus::from_outcome(&WorkerOutcome::Failed("x".into())),
            WorkerStatus::Failed { code: 1 }
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(WorkerStatus::Succeeded.to_string(), "ok");
        assert_eq!(WorkerStatus::Signaled { signal: 9 }.to_string(), "killed by signal 9");
    }

    #[test]
    fn test_create_launcher() {
        assert_eq!(create_launcher(LaunchMode::Fork).name(), "fork");
        assert_eq!(create_launcher(LaunchMode::Thread).name(), "thread");
    }
}
