//! Run configuration.

use crate::error::{ImaginarError, Result};
use crate::latent::LatentPrior;
use crate::loss::LossWeights;

/// Fast-mode caps, traded against search quality.
const FAST_EPOCHS: usize = 5;
const FAST_ITERATIONS: usize = 500;
const FAST_CUTOUTS: usize = 64;

/// Configuration for a dream run.
///
/// Fast mode is a configuration axis, not a different algorithm: it caps
/// epochs, iterations, and cutouts for a coarser, quicker search.
#[derive(Debug, Clone)]
pub struct DreamConfig {
    /// Adam learning rate.
    pub lr: f32,
    /// Number of epochs (stagnation-check boundaries).
    pub epochs: usize,
    /// Iterations per epoch.
    pub iterations: usize,
    /// Random crops scored per iteration.
    pub num_cutouts: usize,
    /// Independent latent copies optimized in parallel.
    pub copies: usize,
    /// Optional hard cap on simultaneously active classes.
    pub max_classes: Option<usize>,
    /// Bias cutout sampling and initial noise toward the center.
    pub center_bias: bool,
    /// Reduced-budget search.
    pub fast: bool,
    /// Emit a progress render every this many iterations.
    pub snapshot_every: usize,
    /// Loss component weights.
    pub weights: LossWeights,
    /// Global-norm gradient clip; None disables clipping.
    pub max_grad_norm: Option<f32>,
    /// Subtract the mean from each gradient buffer before stepping.
    pub grad_centering: bool,
    /// Minimum per-epoch best-score improvement; at or below this the epoch
    /// ends in a latent resample.
    pub restart_margin: f32,
    /// Seed for latent sampling and crop augmentation. None draws from the
    /// OS entropy source.
    pub seed: Option<u64>,
    /// Latent prior parameters.
    pub prior: LatentPrior,
}

impl Default for DreamConfig {
    fn default() -> Self {
        Self {
            lr: 0.07,
            epochs: 20,
            iterations: 1050,
            num_cutouts: 96,
            copies: 1,
            max_classes: None,
            center_bias: false,
            fast: false,
            snapshot_every: 50,
            weights: LossWeights::default(),
            max_grad_norm: Some(1.0),
            grad_centering: true,
            restart_margin: 0.0,
            seed: None,
            prior: LatentPrior::default(),
        }
    }
}

impl DreamConfig {
    /// Reject invalid field values with field-level diagnostics.
    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ImaginarError::config(
                "lr",
                format!("must be a positive finite number, got {}", self.lr),
                "use a value like 0.07",
            ));
        }
        if self.epochs == 0 {
            return Err(ImaginarError::config("epochs", "must be at least 1", "use 20 for a full search"));
        }
        if self.iterations == 0 {
            return Err(ImaginarError::config(
                "iterations",
                "must be at least 1",
                "use 1050 for a full search",
            ));
        }
        if self.num_cutouts == 0 {
            return Err(ImaginarError::config(
                "num_cutouts",
                "must be at least 1",
                "use 96, or 64 in fast mode",
            ));
        }
        if self.copies == 0 {
            return Err(ImaginarError::config("copies", "must be at least 1", "use 1 for a single latent"));
        }
        if self.snapshot_every == 0 {
            return Err(ImaginarError::config(
                "snapshot_every",
                "must be at least 1",
                "use 50 to snapshot every 50 iterations",
            ));
        }
        if !(self.restart_margin.is_finite() && self.restart_margin >= 0.0) {
            return Err(ImaginarError::config(
                "restart_margin",
                "must be finite and non-negative",
                "use 0.0 to resample only on complete stagnation",
            ));
        }
        if !(self.weights.sim_coef.is_finite() && self.weights.sim_coef > 0.0) {
            return Err(ImaginarError::config(
                "sim_coef",
                "must be a positive finite number",
                "use the default of 100",
            ));
        }
        Ok(())
    }

    /// Epoch count after fast-mode capping.
    #[must_use]
    pub fn effective_epochs(&self) -> usize {
        if self.fast { self.epochs.min(FAST_EPOCHS) } else { self.epochs }
    }

    /// Per-epoch iteration count after fast-mode capping.
    #[must_use]
    pub fn effective_iterations(&self) -> usize {
        if self.fast { self.iterations.min(FAST_ITERATIONS) } else { self.iterations }
    }

    /// Cutout count after fast-mode capping.
    #[must_use]
    pub fn effective_cutouts(&self) -> usize {
        if self.fast { self.num_cutouts.min(FAST_CUTOUTS) } else { self.num_cutouts }
    }
}
