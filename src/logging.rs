//! Logging init: structured `tracing` events on stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub(crate) fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,mjconv=debug"
    } else {
        "warn,mjconv=info"
    }
}

/// Initialize logging to stderr. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
