//! Worker-side execution
//!
//! A worker is one isolated execution unit (forked process or OS thread) that
//! runs exactly one partition. This module defines what the worker runs:
//!
//! - **TaskHandler**: the caller-supplied callback doing the actual work
//! - **WorkAssignment**: the immutable input a worker receives at spawn time
//! - **run_assignment**: the worker body, shared by every launcher
//!
//! # Handler failures
//!
//! A handler returning `Err` is logged and turned into
//! [`WorkerOutcome::Failed`]. Nothing is retried and sibling workers keep
//! running; the coordinator only records the failed exit.
//!
//! # Example
//!
//! ```
//! use multiworker::worker::{TaskHandler, WorkAssignment};
//!
//! let handler = |work: &WorkAssignment| -> anyhow::Result<()> {
//!     if work.is_last() {
//!         println!("SELECT * FROM t WHERE id >= {}", work.start_id());
//!     } else {
//!         println!("SELECT * FROM t WHERE id BETWEEN {} AND {}", work.start_id(), work.end_id());
//!     }
//!     Ok(())
//! };
//! # let _: &dyn TaskHandler = &handler;
//! ```

pub mod affinity;

use crate::partition::Partition;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info_span, warn};

/// Caller-supplied work for one partition
///
/// Invoked once per worker, inside the worker's execution context. In fork
/// mode that is a child process: side effects on memory are not visible to
/// the parent.
pub trait TaskHandler: Send + Sync {
    fn handle(&self, assignment: &WorkAssignment) -> anyhow::Result<()>;
}

impl<F> TaskHandler for F
where
    F: Fn(&WorkAssignment) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, assignment: &WorkAssignment) -> anyhow::Result<()> {
        self(assignment)
    }
}

/// Everything a worker knows about its job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkAssignment {
    pub partition: Partition,
    /// pid (fork mode) or pthread id (thread mode); observability only
    pub execution_id: u64,
    /// CPU core the worker was pinned to, if any
    pub cpu_core: Option<usize>,
}

impl WorkAssignment {
    pub fn start_id(&self) -> u64 {
        self.partition.start_id
    }

    pub fn end_id(&self) -> u64 {
        self.partition.end_id
    }

    pub fn is_last(&self) -> bool {
        self.partition.is_last
    }

    pub fn work_page(&self) -> usize {
        self.partition.work_page
    }
}

/// How a worker body ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    Failed(String),
}

impl WorkerOutcome {
    /// Process exit code used in fork mode
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerOutcome::Completed => 0,
            WorkerOutcome::Failed(_) => 1,
        }
    }
}

/// Run one assignment: pin if requested, call the handler, log the result
pub fn run_assignment(handler: &dyn TaskHandler, assignment: &WorkAssignment) -> WorkerOutcome {
    let span = info_span!(
        "worker",
        work_page = assignment.work_page(),
        execution_id = assignment.execution_id
    );
    let _enter = span.enter();

    if let Some(core) = assignment.cpu_core {
        if let Err(e) = affinity::pin_to_core(core) {
            warn!(core, error = %format!("{:#}", e), "running unpinned");
        }
    }

    debug!(
        start_id = assignment.start_id(),
        end_id = assignment.end_id(),
        is_last = assignment.is_last(),
        "worker started"
    );

    match handler.handle(assignment) {
        Ok(()) => {
            debug!("worker finished");
            WorkerOutcome::Completed
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "task handler failed");
            WorkerOutcome::Failed(message)
        }
    }
}
