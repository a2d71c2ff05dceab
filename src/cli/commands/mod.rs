//! CLI command implementations

mod dream;

use crate::cli::args::{Cli, Command};
use crate::cli::LogLevel;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    match cli.command {
        Command::Dream(args) => dream::run_dream(args, log_level),
    }
}
