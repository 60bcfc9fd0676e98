//! Logging setup for host binaries.
//!
//! The library itself only emits `tracing` events; hosts that want output
//! call [`init`] once at startup (or install their own subscriber).

use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber filtered by `level` (an
/// `EnvFilter` directive, e.g. `"info"` or `"engram=debug"`).
///
/// Silently does nothing if a global subscriber is already set, so tests
/// and embedding hosts can call it freely.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
