//! Logging setup for the CLI.
//!
//! Output formats (SVG, PNG, JSON) go to stdout, so logs always go to
//! stderr. The terminal viewer owns the screen and discards them.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where log lines end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Discard,
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over the defaults; `verbose` lowers the default to debug.
pub fn init_logging(verbose: bool, target: LogTarget) {
    let default_filter = if verbose { "debug" } else { "warn,lsys=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    match target {
        LogTarget::Stderr => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_target(true)
                    .with_file(verbose)
                    .with_line_number(verbose),
            )
            .init(),
        LogTarget::Discard => registry.with(fmt::layer().with_writer(std::io::sink)).init(),
    }
}
