//! Dream command implementation

use crate::cli::logging::log;
use crate::cli::ppm::write_ppm;
use crate::cli::LogLevel;
use crate::cli::args::DreamArgs;
use crate::dream::{CallbackAction, DreamCallback, DreamConfig, Dreamer, StepContext};
use crate::error::ImaginarError;
use crate::model::{ProceduralCritic, ProceduralGenerator};
use crate::prompt::PhraseSet;
use crate::Image;
use std::path::PathBuf;

/// Latent and embedding dimensions of the bundled procedural backend,
/// mirroring the class-conditional generators this tool targets.
const NOISE_DIM: usize = 128;
const NUM_CLASSES: usize = 1000;
const EMBED_DIM: usize = 512;
const CRITIC_INPUT: usize = 224;

/// Iterations between progress lines at normal verbosity.
const LOG_EVERY: usize = 100;

fn fmt_err(e: ImaginarError) -> String {
    format!("[{}] {e}", e.code())
}

/// Logs loop progress at the configured verbosity.
struct ProgressLogger {
    level: LogLevel,
}

impl DreamCallback for ProgressLogger {
    fn on_run_begin(&mut self, ctx: &StepContext) -> CallbackAction {
        log(
            self.level,
            LogLevel::Normal,
            &format!(
                "Dreaming for {} epochs x {} iterations",
                ctx.max_epochs, ctx.iterations_per_epoch
            ),
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &StepContext) -> CallbackAction {
        let every = self.level.progress_stride(LOG_EVERY);
        if (ctx.iteration + 1) % every == 0 {
            log(
                self.level,
                LogLevel::Normal,
                &format!(
                    "epoch {}/{} iter {}/{} loss {:.3} best {}",
                    ctx.epoch + 1,
                    ctx.max_epochs,
                    ctx.iteration + 1,
                    ctx.iterations_per_epoch,
                    ctx.terms.total(),
                    ctx.best_score.map_or_else(|| "-".to_string(), |s| format!("{s:.4}")),
                ),
            );
        }
        CallbackAction::Continue
    }

    fn on_best(&mut self, _image: &Image, score: f32, iteration: usize) {
        log(
            self.level,
            LogLevel::Verbose,
            &format!("new best {score:.4} at iteration {iteration}"),
        );
    }

    fn on_skip(&mut self, ctx: &StepContext) {
        log(
            self.level,
            LogLevel::Verbose,
            &format!("skipped step {} (non-finite loss)", ctx.global_step),
        );
    }

    fn on_restart(&mut self, epoch: usize) {
        log(
            self.level,
            LogLevel::Normal,
            &format!("no improvement in epoch {}, resampling latents", epoch + 1),
        );
    }

    fn on_run_end(&mut self, ctx: &StepContext) {
        log(
            self.level,
            LogLevel::Normal,
            &format!("done in {:.1}s", ctx.elapsed_secs),
        );
    }

    fn name(&self) -> &'static str {
        "ProgressLogger"
    }
}

/// Writes progress and best renders to the output directory.
struct SnapshotWriter {
    dir: PathBuf,
    slug: String,
    save_progress: bool,
    save_best: bool,
}

impl SnapshotWriter {
    fn write(&self, path: PathBuf, image: &Image) {
        // Snapshot failures should not kill a run that is hours in; the
        // final write in run_dream still reports errors properly.
        if let Err(e) = write_ppm(&path, image) {
            eprintln!("Warning: {e}");
        }
    }
}

impl DreamCallback for SnapshotWriter {
    fn on_snapshot(&mut self, render: &Image, ctx: &StepContext) {
        self.write(self.dir.join(format!("{}.ppm", self.slug)), render);
        if self.save_progress {
            let frame = self.dir.join(format!("{}.{:06}.ppm", self.slug, ctx.global_step));
            self.write(frame, render);
        }
    }

    fn on_best(&mut self, image: &Image, _score: f32, _iteration: usize) {
        if self.save_best {
            self.write(self.dir.join(format!("{}.best.ppm", self.slug)), image);
        }
    }

    fn name(&self) -> &'static str {
        "SnapshotWriter"
    }
}

fn config_from(args: &DreamArgs) -> DreamConfig {
    let mut config = DreamConfig::default();
    config.lr = args.lr;
    config.epochs = args.epochs;
    config.iterations = args.iterations;
    config.num_cutouts = args.num_cutouts;
    config.copies = args.copies;
    config.max_classes = args.max_classes;
    config.center_bias = args.center_bias;
    config.fast = args.fast;
    config.snapshot_every = args.save_every;
    config.seed = args.seed;
    config
}

pub fn run_dream(args: DreamArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Imaginar: dreaming \"{}\"", args.text),
    );

    let config = config_from(&args);
    let phrases = PhraseSet::parse(&args.text, &args.penalize).map_err(fmt_err)?;

    if args.dry_run {
        config.validate().map_err(fmt_err)?;
        log(level, LogLevel::Normal, "Dry run - configuration is valid");
        log(
            level,
            LogLevel::Verbose,
            &format!("  Encourage: {:?}", phrases.encourage()),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Discourage: {:?}", phrases.discourage()),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Budget: {} epochs x {} iterations, {} cutouts",
                config.effective_epochs(),
                config.effective_iterations(),
                config.effective_cutouts()
            ),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Optimizer: Adam (lr={})", config.lr),
        );
        return Ok(());
    }

    std::fs::create_dir_all(&args.output_dir).map_err(|e| {
        fmt_err(ImaginarError::io(
            format!("creating {}", args.output_dir.display()),
            e,
        ))
    })?;

    let generator = ProceduralGenerator::new(NOISE_DIM, NUM_CLASSES, args.image_size);
    let critic = ProceduralCritic::new(EMBED_DIM, CRITIC_INPUT);
    let slug = phrases.slug();

    let mut dreamer = Dreamer::new(generator, critic, config, phrases).map_err(fmt_err)?;
    dreamer.add_callback(ProgressLogger { level });
    dreamer.add_callback(SnapshotWriter {
        dir: args.output_dir.clone(),
        slug: slug.clone(),
        save_progress: args.save_progress,
        save_best: !args.no_save_best,
    });

    let result = dreamer.run().map_err(fmt_err)?;

    match result.best {
        Some(best) => {
            let path = args.output_dir.join(format!("{slug}.ppm"));
            write_ppm(&path, &best.image).map_err(fmt_err)?;
            log(
                level,
                LogLevel::Normal,
                &format!(
                    "Best score {:.4} at iteration {} -> {}",
                    best.score,
                    best.iteration,
                    path.display()
                ),
            );
        }
        None => {
            log(
                level,
                LogLevel::Normal,
                "No result: every iteration was skipped",
            );
        }
    }
    if result.skipped_steps > 0 {
        log(
            level,
            LogLevel::Verbose,
            &format!("{} iterations skipped", result.skipped_steps),
        );
    }
    Ok(())
}
