//! CLI module for aphreton
//!
//! Provides command-line interface for:
//! - serve: Boot the gateway and serve HTTP
//! - check-config: Validate configuration and databases
//! - hash-password: Produce a stored password hash

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, hash_password, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};

use crate::observability::init_tracing;

/// Parse arguments, install logging and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.json_logs)?;
    run_command(cli.command, &cli.config)
}
