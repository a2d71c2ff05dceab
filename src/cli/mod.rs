//! CLI module for imaginar
//!
//! This module contains all CLI command handlers and utilities.

mod args;
mod commands;
mod logging;
mod ppm;

pub use args::{parse_args, Cli, Command, DreamArgs};
pub use commands::run_command;
pub use logging::LogLevel;
pub use ppm::write_ppm;
