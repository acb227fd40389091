//! multiworker CLI entry point

use anyhow::{Context, Result};
use multiworker::config::cli::{Cli, OutputFormat};
use multiworker::config::toml::parse_toml_file;
use multiworker::config::{validator, CoordinatorConfig};
use multiworker::logging::init_logging;
use multiworker::output::{json, text};
use multiworker::{WorkAssignment, WorkerCoordinator};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let config = build_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    let coordinator = WorkerCoordinator::new(config, demo_handler);

    if cli.dry_run {
        text::print_plan(&coordinator.plan()?);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let report = coordinator.start().context("Run failed")?;

    match cli.output {
        OutputFormat::Text => text::print_report(&report),
        OutputFormat::Json => println!("{}", json::report_to_json_string(&report)?),
    }

    if let Some(ref path) = cli.json_output {
        json::write_json_output(path, &report, true)?;
    }

    if !report.all_succeeded() {
        anyhow::bail!(
            "{} of {} workers did not succeed",
            report.worker_count - report.succeeded(),
            report.worker_count
        );
    }

    Ok(())
}

/// Configuration from the TOML file (if any) with CLI overrides
fn build_config(cli: &Cli) -> Result<CoordinatorConfig> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => CoordinatorConfig::default(),
    };

    cli.apply_to(base)
}

/// Demo handler: announce the range each worker is responsible for
///
/// A real handler would page through the range; the last worker should query
/// open-ended to pick up rows inserted after the count was taken.
fn demo_handler(work: &WorkAssignment) -> Result<()> {
    let mut line = format!(
        "worker {} (id {}) handles tasks {}-{}",
        work.work_page(),
        work.execution_id,
        work.start_id(),
        work.end_id()
    );

    if work.is_last() {
        line.push_str(&format!(
            ", last partition: query open-ended, e.g. SELECT * FROM t WHERE id >= {}",
            work.start_id()
        ));
    }

    println!("{}", line);
    Ok(())
}
