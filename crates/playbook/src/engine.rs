//! Boundary with the external task-execution engine

use crate::callback::LifecycleCallback;
use crate::types::{PlayDescription, RunOptions};
use thiserror::Error;

/// The engine crashed, could not start, or aborted the play
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A task-runner that executes one play against the local target
///
/// Implementations block until the play completes and invoke `callback`
/// synchronously, on the calling thread, for every lifecycle event.
/// Per-task failures are reported through the callback; an `Err` means
/// the engine itself failed.
pub trait Engine {
    fn run(
        &self,
        play: &PlayDescription,
        options: &RunOptions,
        callback: &mut dyn LifecycleCallback,
    ) -> Result<(), EngineError>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn run(
        &self,
        play: &PlayDescription,
        options: &RunOptions,
        callback: &mut dyn LifecycleCallback,
    ) -> Result<(), EngineError> {
        (**self).run(play, options, callback)
    }
}

/// Polled by long-running operations to notice an operator interrupt
pub type InterruptCheck = fn() -> bool;

/// Interrupt check that never fires
pub fn never_interrupted() -> bool {
    false
}
