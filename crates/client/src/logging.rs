//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the executable.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "snapfeed_client=debug";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// debug output for this crate.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();
}
