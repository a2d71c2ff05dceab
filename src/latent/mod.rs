//! Trainable latent state: noise copies and per-class logits.
//!
//! A `Latents` owns every parameter the optimizer is allowed to touch. Each
//! copy is an independent (noise, logits) pair optimized in parallel for the
//! same phrase set; the class logits are converted to a probability simplex
//! on materialization, never stored normalized.

use crate::error::{ImaginarError, Result};
use crate::Tensor;
use ndarray::Array1;
use rand::Rng;

/// Fraction by which center bias pulls freshly sampled noise toward the
/// origin. Initialization-time only.
const CENTER_BIAS_PULL: f32 = 0.2;

/// Prior distribution parameters for latent sampling.
///
/// `noise_clamp` doubles as the support bound noise is clamped back into
/// after every optimizer step. The logit prior comes from the generator's
/// training regime: a low mean keeps the initial class mix near-uniform and
/// low-confidence.
#[derive(Debug, Clone, Copy)]
pub struct LatentPrior {
    /// Standard deviation of the noise prior.
    pub noise_std: f32,
    /// Half-width of the noise support; values are clamped into ±this.
    pub noise_clamp: f32,
    /// Mean of the class-logit prior.
    pub logit_mean: f32,
    /// Standard deviation of the class-logit prior.
    pub logit_std: f32,
}

impl Default for LatentPrior {
    fn default() -> Self {
        Self { noise_std: 1.0, noise_clamp: 3.0, logit_mean: -3.9, logit_std: 0.3 }
    }
}

/// Draw one sample from N(mean, std²) via the Box-Muller transform.
fn normal<R: Rng>(rng: &mut R, mean: f32, std: f32) -> f32 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    let z = ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32;
    mean + std * z
}

/// The searchable latent state.
pub struct Latents {
    // Layout: [noise_0, logits_0, noise_1, logits_1, ...]
    params: Vec<Tensor>,
    copies: usize,
    noise_dim: usize,
    num_classes: usize,
    max_classes: Option<usize>,
    prior: LatentPrior,
}

impl Latents {
    /// Sample a fresh latent state from the prior.
    ///
    /// `center_bias` scales the drawn noise toward the origin, biasing
    /// renders toward a centered composition. Pure construction; nothing is
    /// mutated until the optimizer steps.
    pub fn sample<R: Rng>(
        prior: LatentPrior,
        copies: usize,
        noise_dim: usize,
        num_classes: usize,
        max_classes: Option<usize>,
        center_bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if copies == 0 {
            return Err(ImaginarError::config(
                "copies",
                "must be at least 1",
                "use 1 for a single latent, more for parallel variants",
            ));
        }
        if let Some(k) = max_classes {
            if k == 0 || k > num_classes {
                return Err(ImaginarError::config(
                    "max_classes",
                    format!("must be between 1 and {num_classes}"),
                    "omit the limit or pick a value within the class count",
                ));
            }
        }

        let noise_scale = if center_bias { 1.0 - CENTER_BIAS_PULL } else { 1.0 };
        let mut params = Vec::with_capacity(copies * 2);
        for _ in 0..copies {
            let noise: Vec<f32> = (0..noise_dim)
                .map(|_| noise_scale * normal(rng, 0.0, prior.noise_std))
                .collect();
            let logits: Vec<f32> = (0..num_classes)
                .map(|_| normal(rng, prior.logit_mean, prior.logit_std))
                .collect();
            params.push(Tensor::from_vec(noise, true));
            params.push(Tensor::from_vec(logits, true));
        }

        Ok(Self { params, copies, noise_dim, num_classes, max_classes, prior })
    }

    /// Number of independent latent copies.
    #[must_use]
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Noise vector length per copy.
    #[must_use]
    pub fn noise_dim(&self) -> usize {
        self.noise_dim
    }

    /// Class count per copy.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Configured top-K class cap, if any.
    #[must_use]
    pub fn max_classes(&self) -> Option<usize> {
        self.max_classes
    }

    /// The prior this state was sampled from.
    #[must_use]
    pub fn prior(&self) -> &LatentPrior {
        &self.prior
    }

    /// Noise tensor of one copy.
    #[must_use]
    pub fn noise(&self, copy: usize) -> &Tensor {
        &self.params[copy * 2]
    }

    /// Class-logit tensor of one copy.
    #[must_use]
    pub fn logits(&self, copy: usize) -> &Tensor {
        &self.params[copy * 2 + 1]
    }

    /// Mutable noise tensor of one copy.
    pub fn noise_mut(&mut self, copy: usize) -> &mut Tensor {
        &mut self.params[copy * 2]
    }

    /// Mutable class-logit tensor of one copy.
    pub fn logits_mut(&mut self, copy: usize) -> &mut Tensor {
        &mut self.params[copy * 2 + 1]
    }

    /// All parameters as one flat slice for the optimizer.
    pub fn params_mut(&mut self) -> &mut [Tensor] {
        &mut self.params
    }

    /// Indices of the logits allowed to carry probability mass.
    ///
    /// With no `max_classes` cap every index survives. With a cap of K, the
    /// K largest logits (by value) form the support; everything else is
    /// excluded before softmax, so its probability is exactly zero.
    fn support(&self, copy: usize) -> Vec<usize> {
        let logits = self.logits(copy).data();
        match self.max_classes {
            None => (0..logits.len()).collect(),
            Some(k) => {
                let mut idx: Vec<usize> = (0..logits.len()).collect();
                idx.sort_by(|&a, &b| {
                    logits[b].partial_cmp(&logits[a]).unwrap_or(std::cmp::Ordering::Equal)
                });
                idx.truncate(k);
                idx
            }
        }
    }

    /// Produce the `(noise, class_probabilities)` pair for one copy.
    ///
    /// Deterministic given the current parameters. The probability vector is
    /// non-negative and sums to 1; under a top-K cap at most K entries are
    /// nonzero.
    #[must_use]
    pub fn materialize(&self, copy: usize) -> (Array1<f32>, Array1<f32>) {
        let noise = self.noise(copy).data().clone();
        let logits = self.logits(copy).data();
        let support = self.support(copy);

        let max_logit = support
            .iter()
            .map(|&i| logits[i])
            .fold(f32::NEG_INFINITY, f32::max);

        let mut probs = Array1::zeros(logits.len());
        let mut denom = 0.0;
        for &i in &support {
            let e = (logits[i] - max_logit).exp();
            probs[i] = e;
            denom += e;
        }
        probs.mapv_inplace(|p| p / denom);

        (noise, probs)
    }

    /// Softmax VJP: pull a gradient on the class probabilities back to the
    /// logits. Entries outside the top-K support receive zero gradient.
    #[must_use]
    pub fn class_grad(&self, copy: usize, grad_probs: &Array1<f32>) -> Array1<f32> {
        let (_, probs) = self.materialize(copy);
        let inner: f32 = grad_probs
            .iter()
            .zip(probs.iter())
            .map(|(g, p)| g * p)
            .sum();
        let mut grad = Array1::zeros(probs.len());
        for i in 0..probs.len() {
            grad[i] = probs[i] * (grad_probs[i] - inner);
        }
        grad
    }

    /// Clamp every noise value back into the prior's support.
    ///
    /// Runs after every optimizer step, unconditionally.
    pub fn clamp_noise(&mut self) {
        let bound = self.prior.noise_clamp;
        for copy in 0..self.copies {
            self.noise_mut(copy).clamp(bound);
        }
    }

    /// True when every parameter is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.params.iter().all(Tensor::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_default(
        copies: usize,
        max_classes: Option<usize>,
        center_bias: bool,
        seed: u64,
    ) -> Latents {
        let mut rng = StdRng::seed_from_u64(seed);
        Latents::sample(
            LatentPrior::default(),
            copies,
            16,
            10,
            max_classes,
            center_bias,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn test_sample_shapes() {
        let mut lat = sample_default(3, None, false, 42);
        assert_eq!(lat.copies(), 3);
        assert_eq!(lat.noise(0).len(), 16);
        assert_eq!(lat.logits(2).len(), 10);
        assert_eq!(lat.params_mut().len(), 6);
    }

    #[test]
    fn test_sample_rejects_zero_copies() {
        let mut rng = StdRng::seed_from_u64(0);
        let res = Latents::sample(LatentPrior::default(), 0, 16, 10, None, false, &mut rng);
        assert!(res.is_err());
    }

    #[test]
    fn test_sample_rejects_bad_max_classes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(
            Latents::sample(LatentPrior::default(), 1, 16, 10, Some(0), false, &mut rng).is_err()
        );
        assert!(
            Latents::sample(LatentPrior::default(), 1, 16, 10, Some(11), false, &mut rng).is_err()
        );
        assert!(
            Latents::sample(LatentPrior::default(), 1, 16, 10, Some(10), false, &mut rng).is_ok()
        );
    }

    #[test]
    fn test_materialize_is_simplex() {
        let lat = sample_default(2, None, false, 7);
        for copy in 0..2 {
            let (_, probs) = lat.materialize(copy);
            let sum: f32 = probs.sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
            assert!(probs.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_max_classes_limits_support() {
        let lat = sample_default(1, Some(3), false, 11);
        let (_, probs) = lat.materialize(0);
        let nonzero = probs.iter().filter(|&&p| p > 0.0).count();
        assert!(nonzero <= 3);
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_materialize_deterministic() {
        let lat = sample_default(1, Some(4), false, 13);
        let (n1, p1) = lat.materialize(0);
        let (n2, p2) = lat.materialize(0);
        assert_eq!(n1, n2);
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_seeded_sampling_reproducible() {
        let a = sample_default(1, None, false, 99);
        let b = sample_default(1, None, false, 99);
        assert_eq!(a.noise(0).data(), b.noise(0).data());
        assert_eq!(a.logits(0).data(), b.logits(0).data());
    }

    #[test]
    fn test_center_bias_shrinks_noise() {
        let plain = sample_default(1, None, false, 5);
        let biased = sample_default(1, None, true, 5);
        let norm = |t: &Tensor| t.data().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(norm(biased.noise(0)) < norm(plain.noise(0)));
    }

    #[test]
    fn test_clamp_noise_bounds() {
        let mut lat = sample_default(1, None, false, 3);
        lat.noise_mut(0).data_mut().fill(100.0);
        lat.clamp_noise();
        let bound = lat.prior().noise_clamp;
        for &v in lat.noise(0).data() {
            assert!(v <= bound && v >= -bound);
        }
    }

    #[test]
    fn test_class_grad_sums_to_zero() {
        // Softmax output lives on the simplex, so any VJP is tangent to it
        let lat = sample_default(1, None, false, 21);
        let grad_probs = Array1::from(vec![1.0, -2.0, 0.5, 3.0, 0.0, -1.0, 0.2, 0.0, 1.5, -0.3]);
        let grad = lat.class_grad(0, &grad_probs);
        assert_abs_diff_eq!(grad.sum(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_class_grad_matches_finite_difference() {
        let mut lat = sample_default(1, None, false, 31);
        let grad_probs = Array1::from(vec![1.0, 0.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.5]);
        let analytic = lat.class_grad(0, &grad_probs);

        // Objective: dot(probs, grad_probs)
        let eps = 1e-3;
        for i in 0..10 {
            let orig = lat.logits(0).data()[i];
            lat.logits_mut(0).data_mut()[i] = orig + eps;
            let (_, p_plus) = lat.materialize(0);
            lat.logits_mut(0).data_mut()[i] = orig - eps;
            let (_, p_minus) = lat.materialize(0);
            lat.logits_mut(0).data_mut()[i] = orig;

            let fd = (p_plus.dot(&grad_probs) - p_minus.dot(&grad_probs)) / (2.0 * eps);
            assert_abs_diff_eq!(analytic[i], fd, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_class_grad_zero_off_support() {
        let lat = sample_default(1, Some(2), false, 17);
        let (_, probs) = lat.materialize(0);
        let grad_probs = Array1::from(vec![1.0; 10]);
        let grad = lat.class_grad(0, &grad_probs);
        for i in 0..10 {
            if probs[i] == 0.0 {
                assert_eq!(grad[i], 0.0);
            }
        }
    }

    proptest! {
        #[test]
        fn test_simplex_invariant_any_seed(seed in 0u64..500, k in 1usize..=10) {
            let lat = sample_default(1, Some(k), false, seed);
            let (_, probs) = lat.materialize(0);
            prop_assert!((probs.sum() - 1.0).abs() < 1e-4);
            prop_assert!(probs.iter().all(|&p| p >= 0.0));
            prop_assert!(probs.iter().filter(|&&p| p > 0.0).count() <= k);
        }
    }
}
