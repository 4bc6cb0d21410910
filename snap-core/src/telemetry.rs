//! Optional tracing setup for binaries and tests that embed snapgram.
//!
//! Library code only emits spans and events through `tracing`; installing a
//! subscriber is left to the host. Enable the `tracing-basic` feature for a
//! ready-made `fmt` subscriber filtered by `RUST_LOG`.

#[cfg(feature = "tracing-basic")]
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
