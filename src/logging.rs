//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber writing to stderr, so
//! stdout stays free for reports. The filter comes from `RUST_LOG` when set,
//! otherwise `info` (or `debug` with `debug = true`).
//!
//! Forked workers inherit the subscriber; their events carry the `worker`
//! span with `work_page` and `execution_id`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize logging once; later calls are no-ops
pub fn init_logging(debug: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let default_level = if debug { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let result = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(true)
            .try_init();

        // Embedders may already have installed a subscriber
        if result.is_err() {
            tracing::debug!("global tracing subscriber already set, keeping it");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        tracing::info!("logging initialized twice without panicking");
    }
}
