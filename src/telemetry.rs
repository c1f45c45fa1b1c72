//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::MonitoringConfig;

/// Install a fmt subscriber. `RUST_LOG` takes precedence over the configured level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(config: &MonitoringConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fairdraw={}", config.log_level.as_str())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Verbose subscriber for tests, captured by the test harness
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("fairdraw=debug"))
        .with_test_writer()
        .try_init();
}
