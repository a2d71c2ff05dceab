//! Class-conditional generator contract.

use crate::error::Result;
use crate::Image;
use ndarray::Array1;

/// A frozen class-conditional image generator.
///
/// `render` is deterministic given its inputs and differentiable with
/// respect to both of them; `render_vjp` supplies that derivative as a
/// vector-Jacobian product so callers never touch the weights.
pub trait Generator {
    /// Length of the noise vector the generator expects.
    fn noise_dim(&self) -> usize;

    /// Number of classes in the conditioning vector.
    fn num_classes(&self) -> usize;

    /// Side length of the rendered image in pixels.
    fn image_size(&self) -> usize;

    /// Render an image from a noise vector and a class-probability vector.
    fn render(&self, noise: &Array1<f32>, class_probs: &Array1<f32>) -> Result<Image>;

    /// Pull an upstream image gradient back to the inputs.
    ///
    /// Returns `(grad_noise, grad_class_probs)` for the given render inputs.
    fn render_vjp(
        &self,
        noise: &Array1<f32>,
        class_probs: &Array1<f32>,
        upstream: &Image,
    ) -> Result<(Array1<f32>, Array1<f32>)>;
}
