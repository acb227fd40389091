//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Number of workers to spawn (>= 1)
    #[serde(default = "default_count_usize")]
    pub worker_count: usize,
    /// Number of tasks counted before the run (ids `1..=total_task_count`)
    #[serde(default = "default_count")]
    pub total_task_count: u64,
    /// Below this many tasks a parallel run is not worthwhile
    #[serde(default = "default_count")]
    pub min_task_count: u64,
    /// How workers are launched
    #[serde(default)]
    pub launch_mode: LaunchMode,
    /// CPU cores to pin workers to, assigned round-robin by slot
    #[serde(default)]
    pub cpu_list: Option<Vec<usize>>,
}

fn default_count() -> u64 {
    1
}

fn default_count_usize() -> usize {
    1
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_count: default_count_usize(),
            total_task_count: default_count(),
            min_task_count: default_count(),
            launch_mode: LaunchMode::default(),
            cpu_list: None,
        }
    }
}

impl CoordinatorConfig {
    /// Configuration with the three counts set and everything else defaulted
    pub fn new(worker_count: usize, total_task_count: u64, min_task_count: u64) -> Self {
        Self {
            worker_count,
            total_task_count,
            min_task_count,
            ..Self::default()
        }
    }

    pub fn with_launch_mode(mut self, launch_mode: LaunchMode) -> Self {
        self.launch_mode = launch_mode;
        self
    }

    pub fn with_cpu_list(mut self, cores: Vec<usize>) -> Self {
        self.cpu_list = Some(cores);
        self
    }
}

/// Worker launch mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// One forked process per worker
    #[default]
    Fork,
    /// One OS thread per worker
    Thread,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Fork => write!(f, "fork"),
            LaunchMode::Thread => write!(f, "thread"),
        }
    }
}
