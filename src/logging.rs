//! # Process-wide `tracing` setup.
//!
//! Installs a `tracing-subscriber` fmt layer writing to stderr. `RUST_LOG`
//! overrides the default directive, e.g. `RUST_LOG=weatherbox=debug`.

use tracing_subscriber::EnvFilter;

/// Default directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "weatherbox=info";

/// Installs the global subscriber; fails if one is already installed.
pub fn try_init(default_directive: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(default_directive))
        .finish()
        .try_init()
}

/// Installs the global subscriber, ignoring a second installation.
pub fn init(default_directive: &str) {
    let _ = try_init(default_directive);
}

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}
