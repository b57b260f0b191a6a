//! Diagnostic logging for the `lister` binary.
//!
//! Core operations emit `tracing` events; nothing is printed unless a
//! subscriber is installed. Logs go to stderr so stdout stays clean for
//! command output and `--json`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// How much diagnostic output to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Warnings and errors, including per-record failures in batch operations
    #[default]
    Normal,
    /// Adds every write and load
    Verbose,
    Trace,
}

impl Verbosity {
    /// From the CLI's `-v` count and `-q` flag. `-q` wins.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Trace,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over
/// `verbosity`. Calling this more than once is harmless.
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("lister={}", verbosity.level());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time(),
    );
    let _ = subscriber.try_init();
}
