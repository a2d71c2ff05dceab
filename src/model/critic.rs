//! Vision-language critic contract and per-run text-embedding cache.

use crate::error::Result;
use crate::Image;
use ndarray::Array1;
use std::collections::HashMap;

/// A frozen vision-language scoring model.
///
/// Text and image embeddings live in the same comparison space. Only the
/// image side is differentiable; text embeddings are constants for the
/// duration of a run and are cached by [`TextCache`].
pub trait Critic {
    /// Dimension of the shared embedding space.
    fn embed_dim(&self) -> usize;

    /// Side length the critic expects its image input to have.
    fn input_size(&self) -> usize;

    /// Embed a text phrase.
    fn embed_text(&self, phrase: &str) -> Result<Array1<f32>>;

    /// Embed one image crop of side `input_size`.
    fn embed_image(&self, crop: &Image) -> Result<Array1<f32>>;

    /// Pull an upstream embedding gradient back to the crop pixels.
    fn embed_image_vjp(&self, crop: &Image, upstream: &Array1<f32>) -> Result<Image>;
}

/// Memoizes text embeddings per distinct phrase within a run.
///
/// Text encoding is the only critic call whose inputs repeat every
/// iteration, so it is the only one worth caching.
pub struct TextCache<C: Critic> {
    critic: C,
    cache: HashMap<String, Array1<f32>>,
}

impl<C: Critic> TextCache<C> {
    /// Wrap a critic with an empty cache.
    pub fn new(critic: C) -> Self {
        Self { critic, cache: HashMap::new() }
    }

    /// Embed a phrase, reusing the cached embedding when available.
    pub fn embed_text(&mut self, phrase: &str) -> Result<Array1<f32>> {
        if let Some(hit) = self.cache.get(phrase) {
            return Ok(hit.clone());
        }
        let embedding = self.critic.embed_text(phrase)?;
        self.cache.insert(phrase.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Number of distinct phrases currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True when nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop all cached embeddings (phrase set replaced).
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// The wrapped critic.
    pub fn critic(&self) -> &C {
        &self.critic
    }
}
