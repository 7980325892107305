//! CLI module for scalar-index
//!
//! Read-only inspection of a durable index store:
//! - namespaces: list namespaces and row counts
//! - scan: dump one namespace's rows

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{namespaces, open_store, run_command, scan};
pub use errors::{CliError, CliErrorCode, CliResult};

use tracing_subscriber::EnvFilter;

use crate::config::IndexConfig;

/// Parses arguments, loads configuration and runs the chosen command.
pub fn run() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    let config = IndexConfig::load(&cli.config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_command(&cli.command, &config, &mut out)
}
