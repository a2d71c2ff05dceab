//! Deterministic synthetic generator and critic.
//!
//! Both halves are smooth closed-form maps whose Jacobians are written out
//! by hand, so the VJP contracts can be checked against finite differences
//! and the full loop can run without pretrained weights. The "features" are
//! trigonometric fields keyed on index positions, which gives every noise
//! and class coordinate a distinct, reproducible effect on the output.

use crate::error::{ImaginarError, Result};
use crate::model::{Critic, Generator};
use crate::Image;
use ndarray::{Array1, Array3};

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Synthetic class-conditional generator.
///
/// Each pixel is `σ(Σ_k z_k·b_k + Σ_j q_j·p_j)` where `b` and `p` are fixed
/// trigonometric basis fields over (channel, y, x).
pub struct ProceduralGenerator {
    noise_dim: usize,
    num_classes: usize,
    image_size: usize,
}

impl ProceduralGenerator {
    /// Create a generator with the given input contract.
    #[must_use]
    pub fn new(noise_dim: usize, num_classes: usize, image_size: usize) -> Self {
        Self { noise_dim, num_classes, image_size }
    }

    fn noise_basis(&self, k: usize, c: usize, y: usize, x: usize) -> f32 {
        let k = (k + 1) as f32;
        let c = (c + 1) as f32;
        (0.37 * k * c + 0.23 * k * y as f32 - 0.19 * k * x as f32).sin()
            / self.noise_dim as f32
    }

    fn class_basis(&self, j: usize, c: usize, y: usize, x: usize) -> f32 {
        let j = (j + 1) as f32;
        let c = (c + 1) as f32;
        (0.11 * j * c + 0.07 * y as f32 + 0.05 * x as f32 + 0.41 * j).cos()
    }

    /// Pre-activation value at one pixel.
    fn activation(
        &self,
        noise: &Array1<f32>,
        class_probs: &Array1<f32>,
        c: usize,
        y: usize,
        x: usize,
    ) -> f32 {
        let mut a = 0.0;
        for (k, &z) in noise.iter().enumerate() {
            a += z * self.noise_basis(k, c, y, x);
        }
        for (j, &q) in class_probs.iter().enumerate() {
            if q != 0.0 {
                a += q * self.class_basis(j, c, y, x);
            }
        }
        a
    }

    fn check_shapes(&self, noise: &Array1<f32>, class_probs: &Array1<f32>) -> Result<()> {
        if noise.len() != self.noise_dim || class_probs.len() != self.num_classes {
            return Err(ImaginarError::ShapeMismatch {
                expected: vec![self.noise_dim, self.num_classes],
                actual: vec![noise.len(), class_probs.len()],
            });
        }
        Ok(())
    }
}

impl Generator for ProceduralGenerator {
    fn noise_dim(&self) -> usize {
        self.noise_dim
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn image_size(&self) -> usize {
        self.image_size
    }

    fn render(&self, noise: &Array1<f32>, class_probs: &Array1<f32>) -> Result<Image> {
        self.check_shapes(noise, class_probs)?;
        let s = self.image_size;
        let mut data = Array3::zeros((3, s, s));
        for c in 0..3 {
            for y in 0..s {
                for x in 0..s {
                    data[[c, y, x]] = sigmoid(self.activation(noise, class_probs, c, y, x));
                }
            }
        }
        Ok(Image::new(data))
    }

    fn render_vjp(
        &self,
        noise: &Array1<f32>,
        class_probs: &Array1<f32>,
        upstream: &Image,
    ) -> Result<(Array1<f32>, Array1<f32>)> {
        self.check_shapes(noise, class_probs)?;
        if upstream.size() != self.image_size {
            return Err(ImaginarError::ShapeMismatch {
                expected: vec![self.image_size],
                actual: vec![upstream.size()],
            });
        }

        let s = self.image_size;
        let mut grad_noise = Array1::zeros(self.noise_dim);
        let mut grad_classes = Array1::zeros(self.num_classes);
        for c in 0..3 {
            for y in 0..s {
                for x in 0..s {
                    let out = sigmoid(self.activation(noise, class_probs, c, y, x));
                    // dσ/da = σ(a)(1 - σ(a))
                    let local = upstream.data()[[c, y, x]] * out * (1.0 - out);
                    if local == 0.0 {
                        continue;
                    }
                    for k in 0..self.noise_dim {
                        grad_noise[k] += local * self.noise_basis(k, c, y, x);
                    }
                    for j in 0..self.num_classes {
                        grad_classes[j] += local * self.class_basis(j, c, y, x);
                    }
                }
            }
        }
        Ok((grad_noise, grad_classes))
    }
}

/// Synthetic vision-language critic.
///
/// Image embeddings are linear projections of the pixels onto fixed
/// trigonometric filters; text embeddings hash the phrase bytes into the
/// same space. Linearity makes the image VJP exact and trivial.
pub struct ProceduralCritic {
    embed_dim: usize,
    input_size: usize,
}

impl ProceduralCritic {
    /// Create a critic with the given embedding space and input side length.
    #[must_use]
    pub fn new(embed_dim: usize, input_size: usize) -> Self {
        Self { embed_dim, input_size }
    }

    fn filter(&self, d: usize, c: usize, y: usize, x: usize) -> f32 {
        let d = (d + 1) as f32;
        let c = (c + 1) as f32;
        let n = (3 * self.input_size * self.input_size) as f32;
        (0.13 * d * c + 0.29 * d * y as f32 - 0.17 * d * x as f32).sin() / n
    }

    fn check_crop(&self, crop: &Image) -> Result<()> {
        if crop.size() != self.input_size {
            return Err(ImaginarError::ShapeMismatch {
                expected: vec![self.input_size],
                actual: vec![crop.size()],
            });
        }
        Ok(())
    }
}

impl Critic for ProceduralCritic {
    fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn embed_text(&self, phrase: &str) -> Result<Array1<f32>> {
        let mut e = Array1::zeros(self.embed_dim);
        for (i, byte) in phrase.bytes().enumerate() {
            for d in 0..self.embed_dim {
                e[d] += (0.013 * f32::from(byte) * (d + 1) as f32 + 0.71 * i as f32).sin();
            }
        }
        // A constant component keeps empty-adjacent phrases from embedding
        // to the zero vector, which would make cosine undefined.
        for d in 0..self.embed_dim {
            e[d] += 0.05 * ((d + 1) as f32 * 0.61).cos();
        }
        Ok(e)
    }

    fn embed_image(&self, crop: &Image) -> Result<Array1<f32>> {
        self.check_crop(crop)?;
        let s = self.input_size;
        let mut e = Array1::zeros(self.embed_dim);
        for d in 0..self.embed_dim {
            let mut acc = 0.0;
            for c in 0..3 {
                for y in 0..s {
                    for x in 0..s {
                        acc += crop.data()[[c, y, x]] * self.filter(d, c, y, x);
                    }
                }
            }
            e[d] = acc;
        }
        Ok(e)
    }

    fn embed_image_vjp(&self, crop: &Image, upstream: &Array1<f32>) -> Result<Image> {
        self.check_crop(crop)?;
        if upstream.len() != self.embed_dim {
            return Err(ImaginarError::ShapeMismatch {
                expected: vec![self.embed_dim],
                actual: vec![upstream.len()],
            });
        }

        let s = self.input_size;
        let mut grad = Image::zeros(s);
        for d in 0..self.embed_dim {
            let up = upstream[d];
            if up == 0.0 {
                continue;
            }
            for c in 0..3 {
                for y in 0..s {
                    for x in 0..s {
                        grad.data_mut()[[c, y, x]] += up * self.filter(d, c, y, x);
                    }
                }
            }
        }
        Ok(grad)
    }
}
