//! Worker coordinator
//!
//! Validates the configuration, partitions the task range, spawns one worker
//! per partition and reaps every one of them before returning.
//!
//! # Guarantees
//!
//! - Nothing is spawned when validation fails.
//! - `start()` returns only after every spawned worker has terminated and
//!   been reaped, whatever its handler did.
//! - A spawn failure stops further spawns; workers already running are reaped
//!   before the error is returned.
//! - A reap failure is returned only after the launcher's remaining workers
//!   have been drained.
//! - The reap loop is a fixed-count barrier: `await_any()` is called once per
//!   spawned worker, in whatever order workers finish.
//!
//! # Example
//!
//! ```no_run
//! use multiworker::config::{CoordinatorConfig, LaunchMode};
//! use multiworker::coordinator::WorkerCoordinator;
//! use multiworker::worker::WorkAssignment;
//!
//! let config = CoordinatorConfig::new(4, 101, 1).with_launch_mode(LaunchMode::Fork);
//! let coordinator = WorkerCoordinator::new(config, |work: &WorkAssignment| -> anyhow::Result<()> {
//!     println!("worker {} handles {}..={}", work.work_page(), work.start_id(), work.end_id());
//!     Ok(())
//! });
//!
//! let report = coordinator.start()?;
//! assert_eq!(report.reaped(), 4);
//! # Ok::<(), multiworker::error::CoordinatorError>(())
//! ```

use crate::config::validator::validate_config;
use crate::config::CoordinatorConfig;
use crate::error::{ConfigError, CoordinatorError};
use crate::launcher::{create_launcher, WorkerBody, WorkerLauncher, WorkerStatus};
use crate::partition::{partition_size, partitions, range_for, Partition};
use crate::worker::affinity::{core_for_slot, warn_if_oversubscribed};
use crate::worker::{run_assignment, TaskHandler, WorkAssignment};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// One spawned worker as seen by the parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRecord {
    pub partition: Partition,
    pub execution_id: u64,
    pub cpu_core: Option<usize>,
    /// Set once the worker has been reaped
    pub status: Option<WorkerStatus>,
}

/// Outcome of a completed `start()`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub launcher: String,
    pub worker_count: usize,
    pub total_task_count: u64,
    pub partition_size: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// In slot order
    pub workers: Vec<WorkerRecord>,
}

impl RunReport {
    /// Workers whose termination was observed
    pub fn reaped(&self) -> usize {
        self.workers.iter().filter(|w| w.status.is_some()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| matches!(w.status, Some(WorkerStatus::Succeeded)))
            .count()
    }

    /// Workers that terminated with anything but success
    pub fn failed(&self) -> Vec<&WorkerRecord> {
        self.workers
            .iter()
            .filter(|w| matches!(w.status, Some(status) if !status.is_success()))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.worker_count
    }
}

/// Runs a task range across isolated workers
pub struct WorkerCoordinator {
    config: CoordinatorConfig,
    handler: Arc<dyn TaskHandler>,
}

impl WorkerCoordinator {
    /// Create a coordinator for `config`, running `handler` in every worker
    pub fn new<H>(config: CoordinatorConfig, handler: H) -> Self
    where
        H: TaskHandler + 'static,
    {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    pub fn with_shared_handler(config: CoordinatorConfig, handler: Arc<dyn TaskHandler>) -> Self {
        Self { config, handler }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(&self.config)
    }

    /// Partitions a run would use, without spawning anything
    pub fn plan(&self) -> Result<Vec<Partition>, ConfigError> {
        self.validate()?;
        Ok(partitions(self.config.total_task_count, self.config.worker_count))
    }

    /// Run the batch with the launcher selected by `launch_mode`
    ///
    /// # Errors
    ///
    /// - `CoordinatorError::Config` if validation fails (nothing is spawned)
    /// - `CoordinatorError::Spawn` if a worker cannot be created
    /// - `CoordinatorError::Reap` if waiting for a worker fails
    pub fn start(&self) -> Result<RunReport, CoordinatorError> {
        self.validate()?;
        let mut launcher = create_launcher(self.config.launch_mode);
        self.start_with(launcher.as_mut())
    }

    /// Run the batch on a caller-provided launcher
    pub fn start_with(&self, launcher: &mut dyn WorkerLauncher) -> Result<RunReport, CoordinatorError> {
        self.validate()?;

        let config = &self.config;
        let worker_count = config.worker_count;
        let total_task_count = config.total_task_count;
        let size = partition_size(total_task_count, worker_count);

        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            worker_count,
            total_task_count,
            partition_size = size,
            launcher = launcher.name(),
            "starting workers"
        );
        warn_if_oversubscribed(worker_count);

        let mut workers: Vec<WorkerRecord> = Vec::with_capacity(worker_count);

        for work_page in 1..=worker_count {
            let partition = range_for(work_page, worker_count, total_task_count, size);
            let cpu_core = config
                .cpu_list
                .as_deref()
                .and_then(|cores| core_for_slot(cores, work_page));

            let handler = Arc::clone(&self.handler);
            let body: WorkerBody = Box::new(move |execution_id| {
                let assignment = WorkAssignment {
                    partition,
                    execution_id,
                    cpu_core,
                };
                run_assignment(handler.as_ref(), &assignment)
            });

            match launcher.spawn(work_page, body) {
                Ok(handle) => {
                    debug!(%partition, execution_id = handle.execution_id, "spawned worker");
                    workers.push(WorkerRecord {
                        partition,
                        execution_id: handle.execution_id,
                        cpu_core,
                        status: None,
                    });
                }
                Err(source) => {
                    error!(
                        work_page,
                        running = workers.len(),
                        error = %source,
                        "failed to spawn worker, reaping workers already running"
                    );
                    Self::drain_outstanding(launcher);
                    return Err(CoordinatorError::Spawn {
                        work_page,
                        worker_count,
                        source,
                    });
                }
            }
        }

        for _ in 0..worker_count {
            let exit = match launcher.await_any() {
                Ok(exit) => exit,
                Err(source) => {
                    error!(
                        outstanding = launcher.outstanding(),
                        error = %source,
                        "failed to reap worker, draining the rest"
                    );
                    Self::drain_outstanding(launcher);
                    return Err(CoordinatorError::Reap(source));
                }
            };

            if !exit.status.is_success() {
                warn!(
                    work_page = exit.work_page,
                    execution_id = exit.execution_id,
                    status = %exit.status,
                    "worker terminated abnormally"
                );
            }

            match workers.get_mut(exit.work_page.wrapping_sub(1)) {
                Some(record) => record.status = Some(exit.status),
                None => warn!(work_page = exit.work_page, "reaped worker with unknown slot"),
            }
        }

        let report = RunReport {
            launcher: launcher.name().to_string(),
            worker_count,
            total_task_count,
            partition_size: size,
            started_at,
            finished_at: Utc::now(),
            elapsed: clock.elapsed(),
            workers,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed().len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "all workers reaped"
        );

        Ok(report)
    }

    /// Reap whatever the launcher still has outstanding before an error is
    /// returned; further errors are logged, the first one wins
    fn drain_outstanding(launcher: &mut dyn WorkerLauncher) {
        // Tolerate as many failed reaps as there are workers left
        let mut failures_left = launcher.outstanding();
        while launcher.outstanding() > 0 {
            if let Err(e) = launcher.await_any() {
                warn!(
                    outstanding = launcher.outstanding(),
                    error = %e,
                    "failed to reap worker while draining"
                );
                if failures_left == 0 {
                    break;
                }
                failures_left -= 1;
            }
        }
    }
}
