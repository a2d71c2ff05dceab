//! Imaginar CLI
//!
//! Text-guided latent image search: optimize a frozen generator's latent
//! inputs until a frozen vision-language critic sees the phrase.
//!
//! # Usage
//!
//! ```bash
//! # Dream an image from a phrase
//! imaginar dream "a pyramid made of ice"
//!
//! # Steer away from unwanted content
//! imaginar dream "a forest" --penalize "blurry|text"
//!
//! # Quick low-budget search with a fixed seed
//! imaginar dream "fire" --fast --seed 42
//!
//! # Validate flags without running
//! imaginar dream "fire" --dry-run
//! ```

use clap::Parser;
use imaginar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
