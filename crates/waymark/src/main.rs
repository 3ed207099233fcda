//! waymark command-line interface
//!
//! Runs reflow engine operations against a JSON snapshot file and prints the
//! results as JSON on stdout. Diagnostics and logs go to stderr.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::Cli;
use logging::{LoggingConfig, init_logging};

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        filter: cli.log_filter,
    })?;

    commands::execute(cli.command)
}
