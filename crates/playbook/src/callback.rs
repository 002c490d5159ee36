//! Lifecycle callbacks invoked by the engine while a play runs
//!
//! Two sinks implement the same contract: [`TaskCounter`] for the count
//! pass and [`ExecutionCallback`] for the apply pass.

use crate::progress::{ProgressRenderer, RendererSettings};
use crate::types::{Task, TaskResult, TaskTally};

/// Events emitted by an engine, in engine-controlled order
///
/// `on_play_start` always precedes any task event of the same pass.
/// Every method defaults to a no-op.
pub trait LifecycleCallback {
    /// Called once when the play starts
    fn on_play_start(&mut self, _play_name: &str) {}

    /// Called when the engine starts a task
    fn on_task_start(&mut self, _task: &Task) {}

    /// Called when a task completed, changed or not
    fn on_task_ok(&mut self, _result: &TaskResult) {}

    /// Called when a task was skipped
    fn on_task_skipped(&mut self, _result: &TaskResult) {}

    /// Called when a task failed; `ignore_errors` is set when the play tolerates it
    fn on_task_failed(&mut self, _result: &TaskResult, _ignore_errors: bool) {}
}

// ============================================================================
// Count pass
// ============================================================================

/// Counts named tasks and tracks the longest task label
#[derive(Debug, Default)]
pub struct TaskCounter {
    tally: TaskTally,
}

impl TaskCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.tally.total_tasks
    }

    pub fn max_name_length(&self) -> usize {
        self.tally.max_name_length
    }

    pub fn tally(&self) -> TaskTally {
        self.tally
    }
}

impl LifecycleCallback for TaskCounter {
    fn on_task_start(&mut self, task: &Task) {
        if !task.is_named() {
            return;
        }
        let label = task.display_name();
        log::debug!("Counted task: {}", label);
        self.tally.total_tasks += 1;
        self.tally.max_name_length = self.tally.max_name_length.max(label.chars().count());
    }
}

// ============================================================================
// Apply pass
// ============================================================================

/// Drives the progress bar and latches task failures during the apply pass
pub struct ExecutionCallback {
    tally: TaskTally,
    renderer: ProgressRenderer,
    failed: bool,
    failed_tasks: Vec<String>,
    ok: usize,
    changed: usize,
    skipped: usize,
}

impl ExecutionCallback {
    /// Callback with a fresh renderer sized from the count pass
    pub fn new(tally: TaskTally, settings: RendererSettings) -> Self {
        Self {
            tally,
            renderer: ProgressRenderer::new(settings),
            failed: false,
            failed_tasks: Vec::new(),
            ok: 0,
            changed: 0,
            skipped: 0,
        }
    }

    /// Whether any task failed; sticky once set
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Display names of the failed tasks, in order
    pub fn failed_tasks(&self) -> &[String] {
        &self.failed_tasks
    }

    pub fn ok_count(&self) -> usize {
        self.ok
    }

    pub fn changed_count(&self) -> usize {
        self.changed
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn progress_renderer(&self) -> &ProgressRenderer {
        &self.renderer
    }

    pub fn progress_renderer_mut(&mut self) -> &mut ProgressRenderer {
        &mut self.renderer
    }
}

impl LifecycleCallback for ExecutionCallback {
    fn on_play_start(&mut self, play_name: &str) {
        log::debug!("Play '{}' started", play_name);
        if let Err(e) = self
            .renderer
            .start(self.tally.total_tasks, self.tally.max_name_length)
        {
            log::warn!("Could not start progress display: {}", e);
        }
    }

    fn on_task_start(&mut self, task: &Task) {
        if task.is_named() {
            self.renderer.increment_step(&task.display_name());
        }
    }

    fn on_task_ok(&mut self, result: &TaskResult) {
        self.ok += 1;
        if result.changed {
            self.changed += 1;
        }
        self.renderer
            .suspend(|| log::debug!("Task '{}' completed", result.task.display_name()));
    }

    fn on_task_skipped(&mut self, result: &TaskResult) {
        self.skipped += 1;
        self.renderer
            .suspend(|| log::warn!("Task '{}' skipped", result.task.display_name()));
    }

    fn on_task_failed(&mut self, result: &TaskResult, ignore_errors: bool) {
        let name = result.task.display_name();
        let reason = result.message.as_deref().unwrap_or("no message");
        self.renderer.suspend(|| {
            if ignore_errors {
                log::warn!("Task '{}' failed (ignored): {}", name, reason);
            } else {
                log::error!("Task '{}' failed: {}", name, reason);
            }
        });
        self.failed = true;
        self.failed_tasks.push(name);
    }
}
