//! The optimization loop: configuration, callbacks, and the driver.

mod callback;
mod config;
mod driver;

pub use callback::{CallbackAction, CallbackManager, DreamCallback, StepContext};
pub use config::DreamConfig;
pub use driver::{DreamResult, Dreamer, RunState, StepOutcome};
