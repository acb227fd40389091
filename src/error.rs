//! Error types for multiworker
//!
//! - `ConfigError`: invalid worker/task counts, detected before any spawn
//! - `CoordinatorError`: everything `WorkerCoordinator::start` can fail with
//!
//! Handler failures are deliberately absent: they belong to the caller's
//! handler and only show up as a worker's exit status.

use std::io;
use thiserror::Error;

/// Invalid coordinator configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Zero workers requested
    #[error("worker count must be at least 1")]
    NoWorkers,

    /// Some worker would receive an empty range
    #[error("task count ({total}) must not be less than worker count ({workers})")]
    FewerTasksThanWorkers { total: u64, workers: usize },

    /// Too few tasks to be worth running in parallel
    #[error("task count ({total}) is below the configured minimum task count ({minimum})")]
    BelowMinimumTasks { total: u64, minimum: u64 },

    /// Malformed CPU core list
    #[error("invalid cpu list: {0}")]
    InvalidCpuList(String),
}

/// Failure of a coordinated run
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The substrate could not create a worker; earlier workers were reaped
    #[error("failed to spawn worker {work_page} of {worker_count}: {source}")]
    Spawn {
        work_page: usize,
        worker_count: usize,
        #[source]
        source: io::Error,
    },

    /// Waiting for an outstanding worker failed
    #[error("failed to reap worker: {0}")]
    Reap(#[source] io::Error),
}

impl CoordinatorError {
    /// Whether the error was raised before any worker was spawned
    pub fn is_config(&self) -> bool {
        matches!(self, CoordinatorError::Config(_))
    }
}
