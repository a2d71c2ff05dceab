//! CLI argument types

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Imaginar: text-guided latent image search
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "imaginar")]
#[command(version)]
#[command(about = "Optimize generator latents until a vision-language critic sees your phrase")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Dream an image from a text phrase
    Dream(DreamArgs),
}

/// Arguments for the dream command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct DreamArgs {
    /// Text to maximize similarity with; '|' separates multiple phrases
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Text to minimize similarity with; '|' separates multiple phrases
    #[arg(short, long, default_value = "")]
    pub penalize: String,

    /// Learning rate
    #[arg(long, default_value_t = 0.07)]
    pub lr: f32,

    /// Number of epochs
    #[arg(short, long, default_value_t = 20)]
    pub epochs: usize,

    /// Iterations per epoch
    #[arg(short, long, default_value_t = 1050)]
    pub iterations: usize,

    /// Random crops scored per iteration
    #[arg(long, default_value_t = 96)]
    pub num_cutouts: usize,

    /// Independent latent copies optimized in parallel
    #[arg(long, default_value_t = 1)]
    pub copies: usize,

    /// Cap on simultaneously active generator classes
    #[arg(long)]
    pub max_classes: Option<usize>,

    /// Bias crops and initial noise toward the image center
    #[arg(long)]
    pub center_bias: bool,

    /// Reduced-budget search (fewer epochs, iterations, and cutouts)
    #[arg(long)]
    pub fast: bool,

    /// Write a progress snapshot every N iterations
    #[arg(long, default_value_t = 50)]
    pub save_every: usize,

    /// Keep every snapshot as a numbered frame instead of overwriting
    #[arg(long)]
    pub save_progress: bool,

    /// Skip writing the running best-render checkpoint during the search
    #[arg(long)]
    pub no_save_best: bool,

    /// Render side length in pixels
    #[arg(long, default_value_t = 128)]
    pub image_size: usize,

    /// Directory for output images
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Validate the configuration and exit without dreaming
    #[arg(long)]
    pub dry_run: bool,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dream_defaults() {
        let cli = parse_args(["imaginar", "dream", "a red cube"]).unwrap();
        let Command::Dream(args) = cli.command;
        assert_eq!(args.text, "a red cube");
        assert_eq!(args.penalize, "");
        assert_eq!(args.epochs, 20);
        assert_eq!(args.iterations, 1050);
        assert_eq!(args.num_cutouts, 96);
        assert!(!args.fast);
        assert!(args.seed.is_none());
    }

    #[test]
    fn test_dream_overrides() {
        let cli = parse_args([
            "imaginar",
            "dream",
            "fire",
            "--penalize",
            "smoke",
            "--lr",
            "0.05",
            "--fast",
            "--seed",
            "7",
            "--max-classes",
            "15",
        ])
        .unwrap();
        let Command::Dream(args) = cli.command;
        assert_eq!(args.penalize, "smoke");
        assert_eq!(args.lr, 0.05);
        assert!(args.fast);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.max_classes, Some(15));
    }

    #[test]
    fn test_global_flags() {
        let cli = parse_args(["imaginar", "dream", "fire", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_missing_text_rejected() {
        assert!(parse_args(["imaginar", "dream"]).is_err());
    }
}
