//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whoever embeds it.

use tracing_subscriber::EnvFilter;

/// Print events to stdout. `RUST_LOG` picks the verbosity, `info` when unset.
pub fn init_stdout() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
