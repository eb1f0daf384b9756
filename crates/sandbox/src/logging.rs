use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Route `tracing` output through the test harness's captured writer.
///
/// Honors `RUST_LOG`, e.g. `RUST_LOG=testdirs_sandbox=debug` shows every
/// sandbox created, retried and removed. Safe to call from every test: only
/// the first call installs a subscriber.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init();
    if installed.is_ok() {
        tracing::debug!("test logging initialised");
    }
}
