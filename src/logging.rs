//! Logging initialization for the command-line tool.
//!
//! Logs go to stderr so they never mix with the diff on stdout. `RUST_LOG`
//! overrides the default filter.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "plandiff_rs=debug"
    } else {
        "plandiff_rs=info"
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
        // Another subscriber may already be installed by an embedding program.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(false);
        init(true);
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "plandiff_rs=info");
        assert_eq!(default_filter(true), "plandiff_rs=debug");
    }
}
