//! Imaginar: text-guided latent image search
//!
//! Optimizes the latent inputs of a frozen class-conditional image
//! generator so a frozen vision-language critic scores the render as
//! increasingly similar to a text phrase. Neither network trains; the only
//! trainable state is a small latent vector per run.
//!
//! # Architecture
//!
//! - [`latent`]: the searchable state (noise copies plus class logits)
//! - [`model`]: generator and critic contracts plus procedural test backends
//! - [`augment`]: random cutout batching with an exact scatter-add adjoint
//! - [`loss`]: similarity terms and latent regularizers, all closed-form
//! - [`optim`]: Adam, gradient clipping, gradient centering
//! - [`track`]: best-render checkpointing across a non-monotonic search
//! - [`dream`]: the optimization driver, its configuration, and callbacks
//!
//! # Example
//!
//! ```
//! use imaginar::dream::{DreamConfig, Dreamer};
//! use imaginar::model::{ProceduralCritic, ProceduralGenerator};
//! use imaginar::prompt::PhraseSet;
//!
//! let mut config = DreamConfig::default();
//! config.epochs = 1;
//! config.iterations = 3;
//! config.num_cutouts = 4;
//! config.seed = Some(42);
//!
//! let generator = ProceduralGenerator::new(16, 10, 32);
//! let critic = ProceduralCritic::new(32, 16);
//! let phrases = PhraseSet::parse("a crimson spiral", "").unwrap();
//!
//! let mut dreamer = Dreamer::new(generator, critic, config, phrases).unwrap();
//! let result = dreamer.run().unwrap();
//! assert!(result.best.is_some());
//! ```

pub mod augment;
pub mod cli;
pub mod dream;
pub mod error;
pub mod image;
pub mod latent;
pub mod loss;
pub mod model;
pub mod optim;
pub mod prompt;
pub mod tensor;
pub mod track;

pub use error::{ImaginarError, Result};
pub use image::Image;
pub use tensor::Tensor;
