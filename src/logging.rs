//! Tracing subscriber setup for the binary.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Verbose => "archlens=info,warn",
            Verbosity::Debug => "archlens=debug,info",
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity`.
///
/// Idempotent; later calls are ignored.
pub fn init(verbosity: Verbosity) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity == Verbosity::Debug)
            .with_thread_ids(verbosity == Verbosity::Debug);

        // A subscriber installed by an embedding process takes precedence.
        let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
    });
}
