//! Subscriber setup for binaries. Libraries only emit events.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to `default_directive`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(default_directive: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()?;
    Ok(())
}
