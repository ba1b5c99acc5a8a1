//! Diagnostic logging setup
//!
//! Events go to stderr so that stdout carries only command output.
//! `RUST_LOG` takes precedence over the level chosen by flags.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given flags
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "depconf=debug,warn"
    } else {
        "warn"
    }
}

/// Install the global subscriber
///
/// Does nothing if a subscriber is already installed.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
