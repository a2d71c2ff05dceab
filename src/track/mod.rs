//! Best-result tracking across a non-monotonic search.
//!
//! The loop regresses often enough that the final iterate is frequently
//! worse than something seen along the way, so the highest-scoring render
//! is checkpointed independently of the current latent state.

use crate::Image;

/// The highest-scoring render observed so far.
#[derive(Debug, Clone)]
pub struct BestResult {
    /// The render itself.
    pub image: Image,
    /// The encourage score that produced it.
    pub score: f32,
    /// Global iteration at which it was observed.
    pub iteration: usize,
}

/// Tracks the best render seen across all iterations.
///
/// The stored score is monotonically non-decreasing; ties keep the
/// first-seen result. Readable at any time, including mid-run and after a
/// failed run.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<BestResult>,
}

impl BestTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate; kept only when its score strictly exceeds the
    /// stored one. Returns true when the candidate was accepted.
    pub fn observe(&mut self, image: &Image, score: f32, iteration: usize) -> bool {
        let improved = match &self.best {
            None => true,
            Some(best) => score > best.score,
        };
        if improved {
            self.best = Some(BestResult { image: image.clone(), score, iteration });
        }
        improved
    }

    /// The best result so far, if any iteration has scored.
    #[must_use]
    pub fn best(&self) -> Option<&BestResult> {
        self.best.as_ref()
    }

    /// The best score so far.
    #[must_use]
    pub fn score(&self) -> Option<f32> {
        self.best.as_ref().map(|b| b.score)
    }

    /// Forget everything (phrase set changed or state reset).
    pub fn reset(&mut self) {
        self.best = None;
    }

    /// Consume the tracker, yielding the best result.
    #[must_use]
    pub fn into_best(self) -> Option<BestResult> {
        self.best
    }
}
