//! Fork launcher
//!
//! One child process per worker. The child runs the worker body on a copy of
//! the parent's memory and leaves with `_exit`, so no parent destructors or
//! atexit handlers run twice.
//!
//! Workers are placed in a process group of their own, led by the first
//! worker. The parent reaps with `waitpid(-pgid)`, which returns workers in
//! completion order and never touches other children of the process.
//!
//! # Exit codes
//!
//! - `0`: handler succeeded
//! - `1`: handler returned an error
//! - `101`: worker body panicked
//!
//! A handler that calls `std::process::exit(101)` itself is indistinguishable
//! from a panic and is reported as `Panicked`.
//!
//! # Caveats
//!
//! The worker group is not the terminal's foreground group, so a Ctrl-C in the
//! terminal reaches only the parent. Forking a multi-threaded parent only
//! carries the forking thread into the child; handlers must not rely on locks
//! held by other parent threads.

use super::{
    nothing_outstanding, WorkerBody, WorkerExit, WorkerHandle, WorkerLauncher, WorkerStatus,
    PANIC_EXIT_CODE,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Launches workers as forked processes
pub struct ForkLauncher {
    /// pid -> work_page for every child not yet reaped
    children: HashMap<libc::pid_t, usize>,
    /// Process group of the current batch; the first worker's pid
    group: Option<libc::pid_t>,
}

impl ForkLauncher {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            group: None,
        }
    }

    /// Decode a raw `waitpid` status
    fn decode_status(status: libc::c_int) -> WorkerStatus {
        if libc::WIFEXITED(status) {
            WorkerStatus::from_exit_code(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            WorkerStatus::Signaled {
                signal: libc::WTERMSIG(status),
            }
        } else {
            WorkerStatus::Failed { code: status }
        }
    }

    /// Block in `waitpid`, retrying on EINTR
    fn wait(pid: libc::pid_t) -> io::Result<(libc::pid_t, libc::c_int)> {
        loop {
            let mut status: libc::c_int = 0;
            let reaped = unsafe { libc::waitpid(pid, &mut status, 0) };
            if reaped >= 0 {
                return Ok((reaped, status));
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

impl Default for ForkLauncher {
    fn default() -> Self {
        Self::new()
    }
}

/// Child side of a fork; never returns
fn run_child(body: WorkerBody, group: libc::pid_t) -> ! {
    // The parent sets the same group; either call may land first
    unsafe { libc::setpgid(0, group) };

    let pid = unsafe { libc::getpid() } as u64;

    let code = match panic::catch_unwind(AssertUnwindSafe(|| body(pid))) {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => PANIC_EXIT_CODE,
    };

    // _exit skips Rust's stdout flush on shutdown
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    unsafe { libc::_exit(code) }
}

impl WorkerLauncher for ForkLauncher {
    fn spawn(&mut self, work_page: usize, body: WorkerBody) -> io::Result<WorkerHandle> {
        // Buffered output would otherwise be written by parent and child
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        // 0 makes the first worker the leader of a new group
        let group = self.group.unwrap_or(0);
        let pid = unsafe { libc::fork() };

        if pid < 0 {
            return Err(io::Error::last_os_error());
        }

        if pid == 0 {
            run_child(body, group);
        }

        let group = self.group.unwrap_or(pid);
        if unsafe { libc::setpgid(pid, group) } != 0 {
            // Group leader already gone; await_any then waits by pid
            debug!(pid, group, error = %io::Error::last_os_error(), "setpgid from parent failed");
        }
        self.group = Some(group);
        self.children.insert(pid, work_page);
        Ok(WorkerHandle {
            work_page,
            execution_id: pid as u64,
        })
    }

    fn await_any(&mut self) -> io::Result<WorkerExit> {
        let Some(group) = self.group.filter(|_| !self.children.is_empty()) else {
            return Err(nothing_outstanding());
        };

        loop {
            let (pid, raw_status) = match Self::wait(-group) {
                Ok(reaped) => reaped,
                // A worker outside the group; wait for it by pid instead
                Err(err) if err.raw_os_error() == Some(libc::ECHILD) => {
                    let Some(&pid) = self.children.keys().next() else {
                        return Err(err);
                    };
                    warn!(pid, group, "worker not found in its process group");
                    Self::wait(pid)?
                }
                Err(err) => return Err(err),
            };

            let Some(work_page) = self.children.remove(&pid) else {
                warn!(pid, group, "reaped a process that is not a worker of this batch");
                continue;
            };

            if self.children.is_empty() {
                self.group = None;
            }

            let status = Self::decode_status(raw_status);
            debug!(work_page, pid, %status, "reaped worker process");

            return Ok(WorkerExit {
                execution_id: pid as u64,
                work_page,
                status,
            });
        }
    }

    fn outstanding(&self) -> usize {
        self.children.len()
    }

    fn name(&self) -> &'static str {
        "fork"
    }
}

impl Drop for ForkLauncher {
    fn drop(&mut self) {
        for (pid, work_page) in self.children.drain() {
            warn!(work_page, pid, "reaping worker process left unreaped");
            let _ = Self::wait(pid);
        }
        self.group = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_exit_status() {
        // Encoded the way the kernel reports a normal exit: code in bits 8..16
        assert_eq!(ForkLauncher::decode_status(0), WorkerStatus::Succeeded);
        assert_eq!(
            ForkLauncher::decode_status(1 << 8),
            WorkerStatus::Failed { code: 1 }
        );
        assert_eq!(
            ForkLauncher::decode_status(PANIC_EXIT_CODE << 8),
            WorkerStatus::Panicked
        );
    }

    #[test]
    fn test_decode_signal_status() {
        assert_eq!(
            ForkLauncher::decode_status(libc::SIGKILL),
            WorkerStatus::Signaled {
                signal: libc::SIGKILL
            }
        );
    }

    #[test]
    fn test_await_without_children() {
        let mut launcher = ForkLauncher::new();
        let err = launcher.await_any().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(launcher.outstanding(), 0);
    }
}
