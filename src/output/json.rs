//! JSON output formatting
//!
//! Converts a [`RunReport`] into a stable JSON document: durations carry both
//! microseconds and a human-readable form, timestamps are RFC 3339.

use crate::coordinator::RunReport;
use crate::launcher::WorkerStatus;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Per-worker entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWorker {
    pub work_page: usize,
    pub execution_id: u64,
    pub start_id: u64,
    pub end_id: u64,
    pub is_last: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerStatus>,
}

/// Whole-run document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub launcher: String,
    pub worker_count: usize,
    pub total_task_count: u64,
    pub partition_size: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: JsonDuration,
    pub succeeded: usize,
    pub failed: usize,
    pub workers: Vec<JsonWorker>,
}

impl JsonReport {
    pub fn from_report(report: &RunReport) -> Self {
        let workers = report
            .workers
            .iter()
            .map(|w| JsonWorker {
                work_page: w.partition.work_page,
                execution_id: w.execution_id,
                start_id: w.partition.start_id,
                end_id: w.partition.end_id,
                is_last: w.partition.is_last,
                cpu_core: w.cpu_core,
                status: w.status,
            })
            .collect();

        Self {
            launcher: report.launcher.clone(),
            worker_count: report.worker_count,
            total_task_count: report.total_task_count,
            partition_size: report.partition_size,
            started_at: report.started_at,
            finished_at: report.finished_at,
            elapsed: JsonDuration::from_duration(report.elapsed),
            succeeded: report.succeeded(),
            failed: report.failed().len(),
            workers,
        }
    }
}

/// Serialize a report to a pretty-printed JSON string
pub fn report_to_json_string(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport::from_report(report))
        .context("Failed to serialize run report")
}

/// Write a report as JSON to a file
pub fn write_json_output(output_path: &Path, report: &RunReport, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let writer = BufWriter::new(file);
    let doc = JsonReport::from_report(report);

    if pretty {
        serde_json::to_writer_pretty(writer, &doc)?;
    } else {
        serde_json::to_writer(writer, &doc)?;
    }

    Ok(())
}

/// Format duration in human-readable format
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else if micros < 3_600_000_000 {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    } else {
        format!("{:.2}h", micros as f64 / 3_600_000_000.0)
    }
}
