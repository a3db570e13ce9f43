use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout only carries the result protocol. `RUST_LOG`
/// overrides `level` when set.
pub(crate) fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
