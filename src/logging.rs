//! Subscriber setup for the binaries. Library code only emits events.
//!
//! Level is taken from `RUST_LOG` when set, otherwise `info` (or `debug`
//! with `--verbose`).

use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for JSON output.
pub fn init_logging(verbose: bool) -> Result<(), TryInitError> {
    let default_level = if verbose { "debug" } else { "info" };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer)
        .try_init()
}
