//! Subscriber setup for the `tracing` events emitted by the sampler.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives, e.g. `nbgibbs=debug`.
pub const LOG_ENV: &str = "NBGIBBS_LOG";

/// Installs a stderr formatter filtered by `NBGIBBS_LOG`, defaulting to
/// `info`. Later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Like [`init_tracing`] with explicit directives, for tests and embedding.
pub fn init_tracing_with_filter(directives: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_test_writer()
        .try_init();
}
