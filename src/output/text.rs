//! Human-readable text output

use crate::coordinator::RunReport;
use crate::partition::Partition;
use std::fmt::Write;

/// Print a run report to stdout
pub fn print_report(report: &RunReport) {
    print!("{}", render_report(report));
}

/// Print the partitions a run would use (dry run)
pub fn print_plan(partitions: &[Partition]) {
    print!("{}", render_plan(partitions));
}

/// Render a run report
///
/// Lists the run parameters, one line per worker with its range and exit
/// status, and a summary line. The last worker's range is marked open-ended.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "                      RUN RESULTS");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out);
    let _ = writeln!(out, "Launcher:       {}", report.launcher);
    let _ = writeln!(out, "Workers:        {}", report.worker_count);
    let _ = writeln!(out, "Total tasks:    {}", format_number(report.total_task_count));
    let _ = writeln!(out, "Per worker:     {}", format_number(report.partition_size));
    let _ = writeln!(out, "Started:        {}", report.started_at.to_rfc3339());
    let _ = writeln!(out, "Elapsed Time:   {:.3}s", report.elapsed.as_secs_f64());
    let _ = writeln!(out);

    let _ = writeln!(out, "Workers:");
    for worker in &report.workers {
        let status = match worker.status {
            Some(status) => status.to_string(),
            None => "not reaped".to_string(),
        };
        let _ = write!(
            out,
            "  #{:<3} id {:<10} tasks {}",
            worker.partition.work_page,
            worker.execution_id,
            format_range(&worker.partition),
        );
        if let Some(core) = worker.cpu_core {
            let _ = write!(out, " cpu {}", core);
        }
        let _ = writeln!(out, " - {}", status);
    }
    let _ = writeln!(out);

    let failed = report.failed().len();
    let _ = writeln!(
        out,
        "Summary: {} succeeded, {} failed, {} reaped",
        report.succeeded(),
        failed,
        report.reaped()
    );

    out
}

/// Render the partition plan for a dry run
pub fn render_plan(partitions: &[Partition]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Partition plan ({} workers):", partitions.len());
    for partition in partitions {
        let _ = writeln!(
            out,
            "  #{:<3} tasks {} ({} tasks)",
            partition.work_page,
            format_range(partition),
            format_number(partition.len())
        );
    }
    out
}

fn format_range(partition: &Partition) -> String {
    if partition.is_open_ended() {
        format!("{}-{}+", partition.start_id, partition.end_id)
    } else {
        format!("{}-{}", partition.start_id, partition.end_id)
    }
}

/// Format number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
