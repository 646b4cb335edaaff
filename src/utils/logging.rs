//! Logging initialization helpers

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for applications embedding this crate.
///
/// Honors `RUST_LOG`; falls back to `info`. Safe to call more than once,
/// later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init();
}
