//! Tracing setup for embedding applications.
//!
//! Library code logs through `tracing` with module-path targets
//! (`dotsync::transport`, `dotsync::subscription`, ...). Hosts that do not
//! bring their own subscriber can install one here.

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dotsync=info"))
}

/// Install a human-readable subscriber. No-op if one is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init();
}

/// Install a JSON subscriber for log pipelines. No-op if one is already
/// set.
pub fn init_tracing_json() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .try_init();
}
