//! Frozen-network capability interfaces.
//!
//! The generator and critic are external pretrained collaborators. The loop
//! only needs two things from each: a deterministic forward pass and a
//! vector-Jacobian product so gradients can flow back into the latent
//! inputs. Weights are never mutated.
//!
//! The `procedural` backend is a deterministic synthetic implementation of
//! both contracts. It exists so the optimization loop, tracker, and CLI can
//! be exercised end-to-end without pretrained weights.

mod critic;
mod generator;
mod procedural;

pub use critic::{Critic, TextCache};
pub use generator::Generator;
pub use procedural::{ProceduralCritic, ProceduralGenerator};
