//! Configuration validation
//!
//! Runs before any worker is spawned. The checks are ordered so the first
//! failing one is reported, matching the order users think about the counts:
//! workers, then tasks per worker, then the minimum task floor.

use super::*;
use crate::error::ConfigError;

/// Highest CPU core id accepted in a cpu list
pub const MAX_CPU_CORE: usize = 1023;

/// Validate complete configuration
pub fn validate_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    validate_counts(config.worker_count, config.total_task_count, config.min_task_count)?;

    if let Some(ref cores) = config.cpu_list {
        validate_cpu_list(cores)?;
    }

    Ok(())
}

/// Validate the worker/task count relationship
pub fn validate_counts(
    worker_count: usize,
    total_task_count: u64,
    min_task_count: u64,
) -> Result<(), ConfigError> {
    if worker_count == 0 {
        return Err(ConfigError::NoWorkers);
    }

    if total_task_count < worker_count as u64 {
        return Err(ConfigError::FewerTasksThanWorkers {
            total: total_task_count,
            workers: worker_count,
        });
    }

    if total_task_count < min_task_count {
        return Err(ConfigError::BelowMinimumTasks {
            total: total_task_count,
            minimum: min_task_count,
        });
    }

    Ok(())
}

/// Validate a CPU core list for worker pinning
fn validate_cpu_list(cores: &[usize]) -> Result<(), ConfigError> {
    if cores.is_empty() {
        return Err(ConfigError::InvalidCpuList("list cannot be empty".to_string()));
    }

    if let Some(core) = cores.iter().find(|&&core| core > MAX_CPU_CORE) {
        return Err(ConfigError::InvalidCpuList(format!(
            "core {} is too large (max {})",
            core, MAX_CPU_CORE
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&CoordinatorConfig::new(4, 101, 1)).is_ok());
        assert!(validate_config(&CoordinatorConfig::new(1, 1, 1)).is_ok());
        assert!(validate_config(&CoordinatorConfig::new(5, 5, 5)).is_ok());
    }

    #[test]
    fn test_validate_zero_workers() {
        let result = validate_config(&CoordinatorConfig::new(0, 10, 1));
        assert_eq!(result, Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_validate_fewer_tasks_than_workers() {
        let result = validate_config(&CoordinatorConfig::new(5, 3, 1));
        assert_eq!(
            result,
            Err(ConfigError::FewerTasksThanWorkers { total: 3, workers: 5 })
        );
    }

    #[test]
    fn test_validate_below_minimum() {
        let result = validate_config(&CoordinatorConfig::new(2, 50, 100));
        assert_eq!(
            result,
            Err(ConfigError::BelowMinimumTasks { total: 50, minimum: 100 })
        );
    }

    #[test]
    fn test_worker_check_reported_before_minimum() {
        // Both relationships are violated, the worker one wins
        let result = validate_config(&CoordinatorConfig::new(8, 4, 100));
        assert!(matches!(result, Err(ConfigError::FewerTasksThanWorkers { .. })));
    }

    #[test]
    fn test_validate_empty_task_range() {
        let result = validate_config(&CoordinatorConfig::new(1, 0, 0));
        assert!(matches!(result, Err(ConfigError::FewerTasksThanWorkers { .. })));
    }

    #[test]
    fn test_validate_cpu_list() {
        let config = CoordinatorConfig::new(2, 10, 1).with_cpu_list(vec![0, 3]);
        assert!(validate_config(&config).is_ok());

        let config = CoordinatorConfig::new(2, 10, 1).with_cpu_list(vec![]);
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidCpuList(_))));

        let config = CoordinatorConfig::new(2, 10, 1).with_cpu_list(vec![0, 4096]);
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidCpuList(_))));
    }
}
