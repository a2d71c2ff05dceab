//! Gradient-based optimizers for the latent parameters.

mod adam;
mod clip;
mod optimizer;

pub use adam::Adam;
pub use clip::{center_grad, clip_grad_norm};
pub use optimizer::Optimizer;
