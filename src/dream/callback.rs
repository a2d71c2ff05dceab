//! Callback hooks into the optimization loop.
//!
//! The loop reports progress, skips, restarts, and new bests through these
//! hooks instead of doing I/O itself; snapshot writing lives entirely in
//! the caller's callback.

use crate::loss::LossTerms;
use crate::Image;

/// State handed to callbacks at loop events.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// Current epoch (0-indexed).
    pub epoch: usize,
    /// Total epochs planned.
    pub max_epochs: usize,
    /// Current iteration within the epoch.
    pub iteration: usize,
    /// Iterations per epoch.
    pub iterations_per_epoch: usize,
    /// Global iteration count across epochs and restarts.
    pub global_step: usize,
    /// Loss breakdown of the most recent iteration.
    pub terms: LossTerms,
    /// Best encourage score tracked so far.
    pub best_score: Option<f32>,
    /// Current learning rate.
    pub lr: f32,
    /// Seconds since the run began.
    pub elapsed_secs: f64,
}

/// Action to take after a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue the run.
    Continue,
    /// Stop at the next iteration boundary.
    Stop,
}

/// Trait for loop callbacks. All methods default to no-ops.
pub trait DreamCallback: Send {
    /// Called once before the first iteration.
    fn on_run_begin(&mut self, _ctx: &StepContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after the run finishes or is stopped.
    fn on_run_end(&mut self, _ctx: &StepContext) {}

    /// Called before each epoch.
    fn on_epoch_begin(&mut self, _ctx: &StepContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch, before any stagnation restart.
    fn on_epoch_end(&mut self, _ctx: &StepContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after every completed iteration.
    fn on_step_end(&mut self, _ctx: &StepContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called at the configured snapshot interval with the current render.
    fn on_snapshot(&mut self, _render: &Image, _ctx: &StepContext) {}

    /// Called when a non-finite loss forced the iteration to be skipped.
    fn on_skip(&mut self, _ctx: &StepContext) {}

    /// Called when epoch stagnation triggered a latent resample.
    fn on_restart(&mut self, _epoch: usize) {}

    /// Called when the tracker accepted a new best render.
    fn on_best(&mut self, _image: &Image, _score: f32, _iteration: usize) {}

    /// Callback name for diagnostics.
    fn name(&self) -> &'static str {
        "DreamCallback"
    }
}

/// Fans loop events out to a list of callbacks.
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn DreamCallback>>,
}

impl CallbackManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn add<C: DreamCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// True when no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn fan_out<F>(&mut self, mut f: F) -> CallbackAction
    where
        F: FnMut(&mut Box<dyn DreamCallback>) -> CallbackAction,
    {
        let mut action = CallbackAction::Continue;
        for cb in &mut self.callbacks {
            if f(cb) == CallbackAction::Stop {
                action = CallbackAction::Stop;
            }
        }
        action
    }

    pub(crate) fn run_begin(&mut self, ctx: &StepContext) -> CallbackAction {
        self.fan_out(|cb| cb.on_run_begin(ctx))
    }

    pub(crate) fn run_end(&mut self, ctx: &StepContext) {
        for cb in &mut self.callbacks {
            cb.on_run_end(ctx);
        }
    }

    pub(crate) fn epoch_begin(&mut self, ctx: &StepContext) -> CallbackAction {
        self.fan_out(|cb| cb.on_epoch_begin(ctx))
    }

    pub(crate) fn epoch_end(&mut self, ctx: &StepContext) -> CallbackAction {
        self.fan_out(|cb| cb.on_epoch_end(ctx))
    }

    pub(crate) fn step_end(&mut self, ctx: &StepContext) -> CallbackAction {
        self.fan_out(|cb| cb.on_step_end(ctx))
    }

    pub(crate) fn snapshot(&mut self, render: &Image, ctx: &StepContext) {
        for cb in &mut self.callbacks {
            cb.on_snapshot(render, ctx);
        }
    }

    pub(crate) fn skip(&mut self, ctx: &StepContext) {
        for cb in &mut self.callbacks {
            cb.on_skip(ctx);
        }
    }

    pub(crate) fn restart(&mut self, epoch: usize) {
        for cb in &mut self.callbacks {
            cb.on_restart(epoch);
        }
    }

    pub(crate) fn best(&mut self, image: &Image, score: f32, iteration: usize) {
        for cb in &mut self.callbacks {
            cb.on_best(image, score, iteration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::LossTerms;

    struct Counter {
        steps: usize,
        stop_after: usize,
    }

    impl DreamCallback for Counter {
        fn on_step_end(&mut self, _ctx: &StepContext) -> CallbackAction {
            self.steps += 1;
            if self.steps >= self.stop_after {
                CallbackAction::Stop
            } else {
                CallbackAction::Continue
            }
        }
    }

    fn ctx() -> StepContext {
        StepContext {
            epoch: 0,
            max_epochs: 1,
            iteration: 0,
            iterations_per_epoch: 1,
            global_step: 0,
            terms: LossTerms::zero(),
            best_score: None,
            lr: 0.07,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn test_manager_fans_out_and_aggregates_stop() {
        let mut manager = CallbackManager::new();
        manager.add(Counter { steps: 0, stop_after: 2 });

        assert_eq!(manager.step_end(&ctx()), CallbackAction::Continue);
        assert_eq!(manager.step_end(&ctx()), CallbackAction::Stop);
    }

    #[test]
    fn test_empty_manager_continues() {
        let mut manager = CallbackManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.step_end(&ctx()), CallbackAction::Continue);
        assert_eq!(manager.run_begin(&ctx()), CallbackAction::Continue);
    }

    #[test]
    fn test_any_stop_wins() {
        struct Quiet;
        impl DreamCallback for Quiet {}
        struct Stopper;
        impl DreamCallback for Stopper {
            fn on_epoch_end(&mut self, _ctx: &StepContext) -> CallbackAction {
                CallbackAction::Stop
            }
        }

        let mut manager = CallbackManager::new();
        manager.add(Quiet);
        manager.add(Stopper);
        assert_eq!(manager.epoch_end(&ctx()), CallbackAction::Stop);
    }
}
