//! End-to-end runs with forked worker processes
//!
//! Kept to a single test: forking while another test thread holds a lock
//! (the captured stdout, the allocator) can leave the child blocked on it.

use multiworker::config::{CoordinatorConfig, LaunchMode};
use multiworker::launcher::WorkerStatus;
use multiworker::{WorkAssignment, WorkerCoordinator};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn fork_config(workers: usize, total: u64) -> CoordinatorConfig {
    CoordinatorConfig::new(workers, total, 1).with_launch_mode(LaunchMode::Fork)
}

#[test]
fn test_fork_workers_run_isolated_and_are_reaped() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir: PathBuf = dir.path().to_path_buf();

    // Each child writes its assignment to its own file
    let coordinator = WorkerCoordinator::new(fork_config(4, 101), move |work: &WorkAssignment| -> anyhow::Result<()> {
        let line = format!(
            "{} {} {} {}",
            work.start_id(),
            work.end_id(),
            work.is_last(),
            work.execution_id
        );
        fs::write(out_dir.join(format!("worker-{}.txt", work.work_page())), line)?;
        Ok(())
    });

    let report = coordinator.start().unwrap();
    assert_eq!(report.launcher, "fork");
    assert_eq!(report.reaped(), 4);
    assert!(report.all_succeeded());

    let parent_pid = std::process::id() as u64;
    let mut pids = HashSet::new();
    let expected = [
        (1, 25, false),
        (26, 50, false),
        (51, 75, false),
        (76, 101, true),
    ];

    for (page, (start, end, is_last)) in expected.iter().enumerate() {
        let contents = fs::read_to_string(dir.path().join(format!("worker-{}.txt", page + 1))).unwrap();
        let fields: Vec<&str> = contents.split_whitespace().collect();
        assert_eq!(fields[0].parse::<u64>().unwrap(), *start);
        assert_eq!(fields[1].parse::<u64>().unwrap(), *end);
        assert_eq!(fields[2].parse::<bool>().unwrap(), *is_last);

        let pid: u64 = fields[3].parse().unwrap();
        assert_ne!(pid, parent_pid);
        assert_eq!(pid, report.workers[page].execution_id);
        pids.insert(pid);
    }
    assert_eq!(pids.len(), 4);

    // Handler errors and panics end the child process, siblings still finish
    let coordinator = WorkerCoordinator::new(fork_config(3, 30), |work: &WorkAssignment| -> anyhow::Result<()> {
        match work.work_page() {
            1 => anyhow::bail!("upstream unavailable"),
            2 => panic!("corrupt record"),
            _ => Ok(()),
        }
    });

    let report = coordinator.start().unwrap();
    assert_eq!(report.reaped(), 3);
    assert_eq!(report.workers[0].status, Some(WorkerStatus::Failed { code: 1 }));
    assert_eq!(report.workers[1].status, Some(WorkerStatus::Panicked));
    assert_eq!(report.workers[2].status, Some(WorkerStatus::Succeeded));

    // Memory writes in a child never reach the parent
    let touched = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&touched);
    let coordinator = WorkerCoordinator::new(fork_config(2, 2), move |_: &WorkAssignment| -> anyhow::Result<()> {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    });
    coordinator.start().unwrap();
    assert!(!touched.load(std::sync::atomic::Ordering::SeqCst));

    // Workers of one batch share a process group led by the first worker
    let dir = tempfile::tempdir().unwrap();
    let out_dir: PathBuf = dir.path().to_path_buf();
    let coordinator = WorkerCoordinator::new(fork_config(3, 9), move |work: &WorkAssignment| -> anyhow::Result<()> {
        let group = unsafe { libc::getpgrp() };
        fs::write(out_dir.join(format!("group-{}.txt", work.work_page())), group.to_string())?;
        Ok(())
    });
    let report = coordinator.start().unwrap();

    let groups: Vec<u64> = (1..=3)
        .map(|page| {
            fs::read_to_string(dir.path().join(format!("group-{}.txt", page)))
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    assert_eq!(groups, vec![report.workers[0].execution_id; 3]);
    assert_ne!(groups[0], unsafe { libc::getpgrp() } as u64);

    // Reaping workers leaves other children of the process alone
    let mut unrelated = Command::new("true").spawn().unwrap();
    let coordinator = WorkerCoordinator::new(fork_config(2, 4), |_: &WorkAssignment| -> anyhow::Result<()> {
        std::thread::sleep(std::time::Duration::from_millis(50));
        Ok(())
    });
    let report = coordinator.start().unwrap();
    assert_eq!(report.reaped(), 2);
    assert!(report.all_succeeded());
    assert!(unrelated.wait().unwrap().success());

    // A worker killed by a signal is reaped like any other; exiting with the
    // panic code by hand reads as a panic
    let coordinator = WorkerCoordinator::new(fork_config(3, 6), |work: &WorkAssignment| -> anyhow::Result<()> {
        match work.work_page() {
            1 => std::process::abort(),
            2 => std::process::exit(101),
            _ => Ok(()),
        }
    });
    let report = coordinator.start().unwrap();
    assert_eq!(report.reaped(), 3);
    assert_eq!(
        report.workers[0].status,
        Some(WorkerStatus::Signaled { signal: libc::SIGABRT })
    );
    assert_eq!(report.workers[1].status, Some(WorkerStatus::Panicked));
    assert_eq!(report.workers[2].status, Some(WorkerStatus::Succeeded));
}
