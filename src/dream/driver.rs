//! The optimization driver.
//!
//! Owns the run context: latent state, phrase embeddings, optimizer, and
//! best tracker. Nothing else mutates the latent parameters. One `step` is
//! render → score → backprop → step → clamp; `run` wraps it in the epoch
//! loop with stagnation restarts and cooperative cancellation.

use crate::augment::{self, CutoutSpec};
use crate::dream::{CallbackAction, CallbackManager, DreamCallback, DreamConfig, StepContext};
use crate::error::{ImaginarError, Result};
use crate::latent::Latents;
use crate::loss::{
    class_magnitude_penalty, diversity_penalty, mean_similarity, noise_moment_penalty,
    similarity_term, LossTerms,
};
use crate::model::{Critic, Generator, TextCache};
use crate::optim::{center_grad, clip_grad_norm, Adam, Optimizer};
use crate::prompt::PhraseSet;
use crate::track::{BestResult, BestTracker};
use crate::Image;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of a driver. Construction samples the latent state and
/// attaches the optimizer, so a driver is born `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Latent state sampled, optimizer attached, ready to run.
    Initialized,
    /// Inside the iteration loop.
    Running,
    /// Stopped at an iteration boundary before the budget was spent.
    Paused,
    /// Budget fully spent.
    Completed,
}

/// Outcome of a single iteration.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Loss breakdown, summed across copies.
    pub terms: LossTerms,
    /// True when a non-finite loss forced the step to be skipped.
    pub skipped: bool,
    /// True when the iteration produced a new best render.
    pub improved: bool,
    /// The first copy's render, for progress reporting.
    pub render: Image,
}

/// Final report of a run.
#[derive(Debug, Clone)]
pub struct DreamResult {
    /// The best render observed, if any iteration scored.
    pub best: Option<BestResult>,
    /// Epochs entered.
    pub epochs_run: usize,
    /// Iterations completed (including skipped ones).
    pub iterations_run: usize,
    /// Iterations skipped for non-finite losses.
    pub skipped_steps: usize,
    /// True when the run was stopped before its budget.
    pub stopped_early: bool,
    /// Total loss of the last completed iteration.
    pub final_loss: f32,
}

/// Forward-pass products of one latent copy, kept until backprop.
struct CopyForward {
    noise: Array1<f32>,
    probs: Array1<f32>,
    render: Image,
    specs: Vec<CutoutSpec>,
    embed_grads: Vec<Array1<f32>>,
}

/// Drives the latent search against a frozen generator/critic pair.
pub struct Dreamer<G: Generator, C: Critic> {
    generator: G,
    critic: TextCache<C>,
    config: DreamConfig,
    phrases: PhraseSet,
    encourage_embeds: Vec<Array1<f32>>,
    discourage_embeds: Vec<Array1<f32>>,
    latents: Latents,
    optimizer: Adam,
    tracker: BestTracker,
    callbacks: CallbackManager,
    state: RunState,
    rng: StdRng,
    stop: Arc<AtomicBool>,
    global_step: usize,
    // Loop position, kept current by run() so step() can report where a
    // skip happened.
    cur_epoch: usize,
    cur_iteration: usize,
    skipped: usize,
    last_loss: f32,
    start_time: Option<Instant>,
}

impl<G: Generator, C: Critic> Dreamer<G, C> {
    /// Build a driver for the given frozen backends, configuration, and
    /// phrase set. Fails fast on any configuration problem; no partial
    /// state survives an error.
    pub fn new(generator: G, critic: C, config: DreamConfig, phrases: PhraseSet) -> Result<Self> {
        config.validate()?;

        if generator.noise_dim() == 0
            || generator.num_classes() == 0
            || generator.image_size() == 0
            || critic.input_size() == 0
            || critic.embed_dim() == 0
        {
            return Err(ImaginarError::ShapeMismatch {
                expected: vec![1, 1, 1, 1, 1],
                actual: vec![
                    generator.noise_dim(),
                    generator.num_classes(),
                    generator.image_size(),
                    critic.input_size(),
                    critic.embed_dim(),
                ],
            });
        }
        if let Some(k) = config.max_classes {
            if k == 0 || k > generator.num_classes() {
                return Err(ImaginarError::config(
                    "max_classes",
                    format!("must be between 1 and {}", generator.num_classes()),
                    "omit the limit or pick a value within the generator's class count",
                ));
            }
        }

        let mut critic = TextCache::new(critic);
        let encourage_embeds = embed_phrases(&mut critic, phrases.encourage())?;
        let discourage_embeds = embed_phrases(&mut critic, phrases.discourage())?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let latents = Latents::sample(
            config.prior,
            config.copies,
            generator.noise_dim(),
            generator.num_classes(),
            config.max_classes,
            config.center_bias,
            &mut rng,
        )?;
        let optimizer = Adam::default_params(config.lr);

        Ok(Self {
            generator,
            critic,
            config,
            phrases,
            encourage_embeds,
            discourage_embeds,
            latents,
            optimizer,
            tracker: BestTracker::new(),
            callbacks: CallbackManager::new(),
            state: RunState::Initialized,
            rng,
            stop: Arc::new(AtomicBool::new(false)),
            global_step: 0,
            cur_epoch: 0,
            cur_iteration: 0,
            skipped: 0,
            last_loss: 0.0,
            start_time: None,
        })
    }

    /// Register a loop callback.
    pub fn add_callback<CB: DreamCallback + 'static>(&mut self, callback: CB) {
        self.callbacks.add(callback);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The active phrase set.
    #[must_use]
    pub fn phrases(&self) -> &PhraseSet {
        &self.phrases
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &DreamConfig {
        &self.config
    }

    /// The best result tracked so far. Readable at any time, including
    /// mid-run and after a failed run.
    #[must_use]
    pub fn best(&self) -> Option<&BestResult> {
        self.tracker.best()
    }

    /// The current latent state.
    #[must_use]
    pub fn latents(&self) -> &Latents {
        &self.latents
    }

    /// Handle for cooperative cancellation; honored once per iteration
    /// boundary.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Replace the active phrase set.
    ///
    /// The loss landscape changes, so the optimizer moments and the best
    /// tracker are invalidated; the latent state itself is kept.
    pub fn set_phrases(&mut self, encourage: &str, discourage: &str) -> Result<()> {
        let phrases = PhraseSet::parse(encourage, discourage)?;
        self.critic.clear();
        self.encourage_embeds = embed_phrases(&mut self.critic, phrases.encourage())?;
        self.discourage_embeds = embed_phrases(&mut self.critic, phrases.discourage())?;
        self.phrases = phrases;
        self.tracker.reset();
        self.optimizer = Adam::default_params(self.config.lr);
        Ok(())
    }

    /// Discard the latent state and resample from the prior.
    pub fn reset(&mut self) -> Result<()> {
        self.resample_latents()?;
        self.tracker.reset();
        self.state = RunState::Initialized;
        Ok(())
    }

    fn resample_latents(&mut self) -> Result<()> {
        self.latents = Latents::sample(
            self.config.prior,
            self.config.copies,
            self.generator.noise_dim(),
            self.generator.num_classes(),
            self.config.max_classes,
            self.config.center_bias,
            &mut self.rng,
        )?;
        self.optimizer = Adam::default_params(self.config.lr);
        Ok(())
    }

    /// Attach run context to a propagating resource error so the caller
    /// knows which iteration and phrase were in flight.
    fn with_run_context(&self, err: ImaginarError) -> ImaginarError {
        match err {
            ImaginarError::ResourceExhausted { message, .. } => ImaginarError::ResourceExhausted {
                iteration: self.global_step,
                phrase: self.phrases.encourage()[0].clone(),
                message,
            },
            other => other,
        }
    }

    /// Forward pass for one copy: render, cut, embed, score.
    fn forward_copy(&mut self, copy: usize) -> Result<(CopyForward, LossTerms)> {
        let (noise, probs) = self.latents.materialize(copy);
        let render = self
            .generator
            .render(&noise, &probs)
            .map_err(|e| self.with_run_context(e))?;

        let specs = augment::sample_specs(
            &mut self.rng,
            self.generator.image_size(),
            self.config.effective_cutouts(),
            self.config.center_bias,
        );
        let input_size = self.critic.critic().input_size();
        let mut crop_embeds = Vec::with_capacity(specs.len());
        for &spec in &specs {
            let crop = augment::extract(&render, spec, input_size);
            let embed = self
                .critic
                .critic()
                .embed_image(&crop)
                .map_err(|e| self.with_run_context(e))?;
            crop_embeds.push(embed);
        }

        let (enc, enc_grads) = similarity_term(
            &crop_embeds,
            &self.encourage_embeds,
            -1.0,
            self.config.weights.sim_coef,
        );
        let (dis, dis_grads) = similarity_term(
            &crop_embeds,
            &self.discourage_embeds,
            1.0,
            self.config.weights.sim_coef,
        );
        let (noise_pen, _) = noise_moment_penalty(self.latents.noise(copy));
        let (class_pen, _) = class_magnitude_penalty(self.latents.logits(copy));

        let terms = LossTerms {
            encourage: enc,
            discourage: dis,
            noise_reg: self.config.weights.noise_reg * noise_pen,
            class_reg: self.config.weights.class_reg * class_pen,
            diversity: 0.0,
        };

        let embed_grads = enc_grads
            .into_iter()
            .zip(dis_grads)
            .map(|(e, d)| e + d)
            .collect();

        Ok((
            CopyForward { noise, probs, render, specs, embed_grads },
            terms,
        ))
    }

    /// Backward pass for one copy: chain embedding gradients through the
    /// critic, the cutouts, the generator, and the softmax.
    fn backward_copy(&mut self, copy: usize, fwd: &CopyForward) -> Result<()> {
        let image_size = self.generator.image_size();
        let input_size = self.critic.critic().input_size();
        let mut grad_render = Image::zeros(image_size);
        for (spec, embed_grad) in fwd.specs.iter().zip(&fwd.embed_grads) {
            // The crop pixels are reconstructible from the render and spec;
            // re-extract rather than hold every crop in memory.
            let crop = augment::extract(&fwd.render, *spec, input_size);
            let grad_crop = self
                .critic
                .critic()
                .embed_image_vjp(&crop, embed_grad)
                .map_err(|e| self.with_run_context(e))?;
            augment::accumulate_vjp(&mut grad_render, &grad_crop, *spec);
        }

        let (mut grad_noise, grad_probs) = self
            .generator
            .render_vjp(&fwd.noise, &fwd.probs, &grad_render)
            .map_err(|e| self.with_run_context(e))?;
        let mut grad_logits = self.latents.class_grad(copy, &grad_probs);

        let (_, noise_pen_grad) = noise_moment_penalty(self.latents.noise(copy));
        grad_noise += &(noise_pen_grad * self.config.weights.noise_reg);
        let (_, class_pen_grad) = class_magnitude_penalty(self.latents.logits(copy));
        grad_logits += &(class_pen_grad * self.config.weights.class_reg);

        self.latents.noise_mut(copy).accumulate_grad(&grad_noise);
        self.latents.logits_mut(copy).accumulate_grad(&grad_logits);
        Ok(())
    }

    /// Score one copy's render at the canonical center crop against the
    /// encourage phrases only. Deterministic, unaugmented, comparable
    /// across iterations.
    fn canonical_score(&mut self, render: &Image) -> Result<f32> {
        let spec = augment::center_spec(self.generator.image_size());
        let crop = augment::extract(render, spec, self.critic.critic().input_size());
        let embed = self
            .critic
            .critic()
            .embed_image(&crop)
            .map_err(|e| self.with_run_context(e))?;
        Ok(mean_similarity(&[embed], &self.encourage_embeds))
    }

    /// Run one full iteration.
    ///
    /// A non-finite loss skips the optimizer update and the best-result
    /// comparison for this iteration only; the run continues.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let mut forwards = Vec::with_capacity(self.config.copies);
        let mut terms = LossTerms::zero();
        for copy in 0..self.config.copies {
            let (fwd, copy_terms) = self.forward_copy(copy)?;
            terms.accumulate(&copy_terms);
            forwards.push(fwd);
        }

        // Diversity couples the copies, so it is computed once over all of
        // them rather than per copy.
        let div_weight = self.config.weights.diversity_reg;
        let mut div_grads = Vec::new();
        if div_weight != 0.0 && self.config.copies > 1 {
            let noises: Vec<&crate::Tensor> =
                (0..self.config.copies).map(|c| self.latents.noise(c)).collect();
            let (div, grads) = diversity_penalty(&noises);
            terms.diversity = div_weight * div;
            div_grads = grads;
        }

        let total = terms.total();
        if !total.is_finite() {
            self.skipped += 1;
            self.global_step += 1;
            let ctx = self.context(self.cur_epoch, self.cur_iteration);
            self.callbacks.skip(&ctx);
            return Ok(StepOutcome {
                terms,
                skipped: true,
                improved: false,
                render: forwards[0].render.clone(),
            });
        }

        for (copy, fwd) in forwards.iter().enumerate() {
            self.backward_copy(copy, fwd)?;
        }
        for (copy, grad) in div_grads.iter().enumerate() {
            self.latents
                .noise_mut(copy)
                .accumulate_grad(&(grad * div_weight));
        }

        if self.config.grad_centering {
            center_grad(self.latents.params_mut());
        }
        if let Some(max_norm) = self.config.max_grad_norm {
            clip_grad_norm(self.latents.params_mut(), max_norm);
        }
        self.optimizer.step(self.latents.params_mut());
        self.optimizer.zero_grad(self.latents.params_mut());
        self.latents.clamp_noise();

        // Checkpoint the best render across all copies.
        let mut improved = false;
        for fwd in &forwards {
            let score = self.canonical_score(&fwd.render)?;
            if score.is_finite() && self.tracker.observe(&fwd.render, score, self.global_step) {
                improved = true;
            }
        }
        if improved {
            if let Some(best) = self.tracker.best() {
                let (image, score, iteration) = (best.image.clone(), best.score, best.iteration);
                self.callbacks.best(&image, score, iteration);
            }
        }

        self.last_loss = total;
        self.global_step += 1;
        Ok(StepOutcome {
            terms,
            skipped: false,
            improved,
            render: forwards.swap_remove(0).render,
        })
    }

    fn context(&self, epoch: usize, iteration: usize) -> StepContext {
        StepContext {
            epoch,
            max_epochs: self.config.effective_epochs(),
            iteration,
            iterations_per_epoch: self.config.effective_iterations(),
            global_step: self.global_step,
            terms: LossTerms::zero(),
            best_score: self.tracker.score(),
            lr: self.optimizer.lr(),
            elapsed_secs: self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64()),
        }
    }

    /// Run the full iteration budget.
    ///
    /// Epochs whose best score fails to improve by more than the restart
    /// margin end in a latent resample. The stop handle is honored once per
    /// iteration boundary; everything tracked so far stays retrievable.
    pub fn run(&mut self) -> Result<DreamResult> {
        self.state = RunState::Running;
        self.start_time = Some(Instant::now());

        let epochs = self.config.effective_epochs();
        let iterations = self.config.effective_iterations();
        let mut iterations_run = 0;
        let mut epochs_run = 0;
        let mut stopped_early = false;

        let ctx = self.context(0, 0);
        if self.callbacks.run_begin(&ctx) == CallbackAction::Stop {
            stopped_early = true;
        }

        'epochs: for epoch in 0..epochs {
            if stopped_early {
                break;
            }
            epochs_run = epoch + 1;
            let epoch_start_best = self.tracker.score();

            let ctx = self.context(epoch, 0);
            if self.callbacks.epoch_begin(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }

            for iteration in 0..iterations {
                if self.stop.load(Ordering::Relaxed) {
                    stopped_early = true;
                    break 'epochs;
                }

                self.cur_epoch = epoch;
                self.cur_iteration = iteration;
                let outcome = self.step()?;
                iterations_run += 1;

                let mut ctx = self.context(epoch, iteration);
                ctx.terms = outcome.terms;
                if !outcome.skipped && (iteration + 1) % self.config.snapshot_every == 0 {
                    self.callbacks.snapshot(&outcome.render, &ctx);
                }
                if self.callbacks.step_end(&ctx) == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }
            }

            let ctx = self.context(epoch, iterations);
            if self.callbacks.epoch_end(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }

            // Stagnation check: resample to escape a bad basin, except
            // after the final epoch where no iterations remain to use it.
            let improvement = match (epoch_start_best, self.tracker.score()) {
                (_, None) => 0.0,
                (None, Some(_)) => f32::INFINITY,
                (Some(start), Some(end)) => end - start,
            };
            if epoch + 1 < epochs && improvement <= self.config.restart_margin {
                self.resample_latents()?;
                self.callbacks.restart(epoch);
            }
        }

        self.state = if stopped_early { RunState::Paused } else { RunState::Completed };
        let ctx = self.context(epochs_run.saturating_sub(1), 0);
        self.callbacks.run_end(&ctx);

        Ok(DreamResult {
            best: self.tracker.best().cloned(),
            epochs_run,
            iterations_run,
            skipped_steps: self.skipped,
            stopped_early,
            final_loss: self.last_loss,
        })
    }
}

fn embed_phrases<C: Critic>(
    critic: &mut TextCache<C>,
    phrases: &[String],
) -> Result<Vec<Array1<f32>>> {
    phrases.iter().map(|p| critic.embed_text(p)).collect()
}
