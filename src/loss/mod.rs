//! Loss composition: similarity terms plus latent regularizers.
//!
//! Everything here is a closed-form scalar with a hand-derived gradient.
//! The driver chains these gradients through the critic and generator VJPs;
//! no tape is involved.

use crate::Tensor;
use ndarray::Array1;

/// Per-term loss breakdown for one iteration, summed across latent copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossTerms {
    /// Negative scaled mean similarity to the encouraged phrases.
    pub encourage: f32,
    /// Positive scaled mean similarity to the discouraged phrases.
    /// Exactly zero when no phrases are discouraged.
    pub discourage: f32,
    /// Noise moment-matching penalty.
    pub noise_reg: f32,
    /// Class-logit magnitude penalty.
    pub class_reg: f32,
    /// Copy-diversity penalty (zero for a single copy).
    pub diversity: f32,
}

impl LossTerms {
    /// Zeroed breakdown.
    #[must_use]
    pub fn zero() -> Self {
        Self { encourage: 0.0, discourage: 0.0, noise_reg: 0.0, class_reg: 0.0, diversity: 0.0 }
    }

    /// Sum of every term.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.encourage + self.discourage + self.noise_reg + self.class_reg + self.diversity
    }

    /// True when every term is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.total().is_finite()
    }

    /// Element-wise accumulate another breakdown (summation across copies).
    pub fn accumulate(&mut self, other: &LossTerms) {
        self.encourage += other.encourage;
        self.discourage += other.discourage;
        self.noise_reg += other.noise_reg;
        self.class_reg += other.class_reg;
        self.diversity += other.diversity;
    }
}

/// Weights applied to each loss component.
#[derive(Debug, Clone, Copy)]
pub struct LossWeights {
    /// Scale on both similarity terms.
    pub sim_coef: f32,
    /// Weight of the noise moment penalty.
    pub noise_reg: f32,
    /// Weight of the class-logit magnitude penalty.
    pub class_reg: f32,
    /// Weight of the copy-diversity penalty.
    pub diversity_reg: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self { sim_coef: 100.0, noise_reg: 1.0, class_reg: 1.0, diversity_reg: 0.0 }
    }
}

/// Cosine similarity with a zero-norm guard.
#[must_use]
pub fn cosine(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let na = a.dot(a).sqrt();
    let nb = b.dot(b).sqrt();
    if na < 1e-12 || nb < 1e-12 {
        return 0.0;
    }
    a.dot(b) / (na * nb)
}

/// Mean cosine similarity of a batch of crop embeddings against the mean
/// over a phrase embedding set. Used unscaled for best-result scoring.
#[must_use]
pub fn mean_similarity(crop_embeds: &[Array1<f32>], text_embeds: &[Array1<f32>]) -> f32 {
    if crop_embeds.is_empty() || text_embeds.is_empty() {
        return 0.0;
    }
    let mut acc = 0.0;
    for t in text_embeds {
        for e in crop_embeds {
            acc += cosine(e, t);
        }
    }
    acc / (crop_embeds.len() * text_embeds.len()) as f32
}

/// One phrase-set similarity term and its gradient w.r.t. each crop
/// embedding.
///
/// `sign` is −1 for encourage (minimizing the loss maximizes similarity)
/// and +1 for discourage. Phrases are averaged, not maxed: every phrase
/// pulls the embedding simultaneously. An empty phrase set contributes an
/// exact 0.0 and zero gradients.
#[must_use]
pub fn similarity_term(
    crop_embeds: &[Array1<f32>],
    text_embeds: &[Array1<f32>],
    sign: f32,
    sim_coef: f32,
) -> (f32, Vec<Array1<f32>>) {
    let dim = crop_embeds.first().map_or(0, |e| e.len());
    let mut grads: Vec<Array1<f32>> = crop_embeds.iter().map(|_| Array1::zeros(dim)).collect();
    if text_embeds.is_empty() || crop_embeds.is_empty() {
        return (0.0, grads);
    }

    let scale = sign * sim_coef / (crop_embeds.len() * text_embeds.len()) as f32;
    let mut value = 0.0;
    for t in text_embeds {
        let nt = t.dot(t).sqrt();
        if nt < 1e-12 {
            continue;
        }
        let t_hat = t / nt;
        for (k, e) in crop_embeds.iter().enumerate() {
            let ne = e.dot(e).sqrt();
            if ne < 1e-12 {
                continue;
            }
            let e_hat = e / ne;
            let cos = e_hat.dot(&t_hat);
            value += scale * cos;
            // d cos(e, t) / d e = (t̂ - cos·ê) / ‖e‖
            grads[k] += &((&t_hat - &(&e_hat * cos)) * (scale / ne));
        }
    }
    (value, grads)
}

/// Moment-matching penalty pulling a noise copy toward the prior's mean 0
/// and standard deviation 1. Returns the unweighted value and gradient.
#[must_use]
pub fn noise_moment_penalty(noise: &Tensor) -> (f32, Array1<f32>) {
    let z = noise.data();
    let n = z.len() as f32;
    let mean = z.sum() / n;
    let var = z.mapv(|v| (v - mean).powi(2)).sum() / n;
    let std = var.sqrt();

    let value = mean * mean + (std - 1.0) * (std - 1.0);

    let mut grad = Array1::zeros(z.len());
    for (i, &v) in z.iter().enumerate() {
        grad[i] = 2.0 * mean / n;
        if std > 1e-6 {
            grad[i] += 2.0 * (std - 1.0) * (v - mean) / (n * std);
        }
    }
    (value, grad)
}

/// Magnitude penalty on the class logits, discouraging collapse into
/// extreme one-hot assignments. Returns the unweighted value and gradient.
#[must_use]
pub fn class_magnitude_penalty(logits: &Tensor) -> (f32, Array1<f32>) {
    let l = logits.data();
    let n = l.len() as f32;
    let value = l.mapv(|v| v * v).sum() / n;
    let grad = l.mapv(|v| 2.0 * v / n);
    (value, grad)
}

/// Diversity penalty across parallel noise copies: the negated mean pairwise
/// squared distance, normalized by dimension. Minimizing it pushes copies
/// apart. Returns the unweighted value and per-copy gradients; zero when
/// fewer than two copies exist.
#[must_use]
pub fn diversity_penalty(noises: &[&Tensor]) -> (f32, Vec<Array1<f32>>) {
    let m = noises.len();
    if m < 2 {
        return (0.0, noises.iter().map(|t| Array1::zeros(t.len())).collect());
    }
    let d = noises[0].len() as f32;
    let pairs = (m * (m - 1) / 2) as f32;
    let norm = pairs * d;

    let mut value = 0.0;
    let mut grads: Vec<Array1<f32>> = noises.iter().map(|t| Array1::zeros(t.len())).collect();
    for i in 0..m {
        for j in (i + 1)..m {
            let diff = noises[i].data() - noises[j].data();
            value -= diff.dot(&diff) / norm;
            let g = &diff * (2.0 / norm);
            grads[i] -= &g;
            grads[j] += &g;
        }
    }
    (value, grads)
}
