//! CLI infrastructure for the active inference toolkit
//!
//! This module provides the command-line interface for running preset or
//! file-based simulations and the design tool.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod commands;
pub mod output;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the library logs at `warn`, or at
/// `debug` with `verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aif_pomdp={level}")));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
