//! multiworker - run a numbered task range across isolated workers
//!
//! multiworker splits the task ids `1..=N` into contiguous partitions, one per
//! worker, and runs a caller-supplied handler for each partition in its own
//! forked process or OS thread. The parent blocks until every worker has been
//! reaped.
//!
//! # Architecture
//!
//! - **partition**: pure range arithmetic, last partition absorbs the remainder
//! - **launcher**: worker launch substrates (fork, thread, mock)
//! - **worker**: the `TaskHandler` callback and the per-worker body
//! - **coordinator**: validation, spawning and the fixed-count reap loop
//! - **config / output / logging**: TOML + CLI configuration, reports, tracing
//!
//! Unix only: workers are identified by pid or pthread id.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod output;
pub mod partition;
pub mod worker;

// Re-export commonly used types
pub use config::CoordinatorConfig;
pub use coordinator::{RunReport, WorkerCoordinator};
pub use error::{ConfigError, CoordinatorError};
pub use partition::Partition;
pub use worker::{TaskHandler, WorkAssignment};

/// Result type used by application-level code (config loading, output)
pub type Result<T> = anyhow::Result<T>;
