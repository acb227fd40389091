//! CLI argument parsing using clap

use super::{CoordinatorConfig, LaunchMode};
use crate::worker::affinity::parse_cpu_list;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Worker launch mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One forked process per worker
    Fork,
    /// One OS thread per worker
    Thread,
}

impl From<ModeArg> for LaunchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fork => LaunchMode::Fork,
            ModeArg::Thread => LaunchMode::Thread,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON document on stdout
    Json,
}

/// multiworker - run a numbered task range across isolated workers
#[derive(Parser, Debug)]
#[command(name = "multiworker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of workers
    #[arg(short = 'w', long, env = "MULTIWORKER_WORKERS")]
    pub workers: Option<usize>,

    /// Total number of tasks (ids 1..=N)
    #[arg(short = 'n', long, env = "MULTIWORKER_TOTAL_TASKS")]
    pub total_tasks: Option<u64>,

    /// Minimum task count for a parallel run to be worthwhile
    #[arg(long)]
    pub min_tasks: Option<u64>,

    /// Worker launch mechanism
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Pin workers to CPU cores, round-robin by slot (e.g. "0,2-3")
    #[arg(long)]
    pub cpu_list: Option<String>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Validate configuration and print partitions without spawning workers
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply the values given on the command line on top of `config`
    pub fn apply_to(&self, mut config: CoordinatorConfig) -> Result<CoordinatorConfig> {
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(total) = self.total_tasks {
            config.total_task_count = total;
        }
        if let Some(min) = self.min_tasks {
            config.min_task_count = min;
        }
        if let Some(mode) = self.mode {
            config.launch_mode = mode.into();
        }
        if let Some(ref list) = self.cpu_list {
            config.cpu_list = Some(parse_cpu_list(list)?);
        }
        Ok(config)
    }
}
