//! Live progress bar repainted from a background thread
//!
//! The orchestration thread advances the step counter as the engine
//! announces tasks; a dedicated render thread repaints the bar every tick
//! from the shared state. Both sides only go through [`Shared`], so the
//! renderer never observes a half-written update.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Repaint interval of the render loop
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Delay applied after each step to pace task starts
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

const BAR_TEMPLATE: &str = "{prefix} [{elapsed_precise}] {wide_bar} ({eta})";

/// Sentinel for "total not known yet"
const UNSIZED: u64 = u64::MAX;

/// Tunables for a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererSettings {
    pub tick: Duration,
    pub pacing: Duration,
    /// Draw nowhere (tests, non-interactive runs)
    pub hidden: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            pacing: DEFAULT_PACING,
            hidden: false,
        }
    }
}

impl RendererSettings {
    /// Hidden renderer without pacing
    pub fn hidden() -> Self {
        Self {
            tick: Duration::from_millis(10),
            pacing: Duration::ZERO,
            hidden: true,
        }
    }
}

/// Lifecycle of a renderer; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct Step {
    current: u64,
    label: String,
}

/// State shared with the render thread
#[derive(Debug)]
struct Shared {
    total: AtomicU64,
    step: Mutex<Step>,
}

impl Shared {
    fn new() -> Self {
        Self {
            total: AtomicU64::new(UNSIZED),
            step: Mutex::new(Step::default()),
        }
    }

    fn step(&self) -> MutexGuard<'_, Step> {
        match self.step.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn size(&self, total: u64) {
        let mut step = self.step();
        self.total.store(total, Ordering::Release);
        step.current = step.current.min(total);
    }

    fn advance(&self, label: &str) {
        let mut step = self.step();
        let total = self.total.load(Ordering::Acquire);
        if step.current < total {
            step.current += 1;
        }
        step.label.clear();
        step.label.push_str(label);
    }

    fn snapshot(&self) -> (u64, String) {
        let step = self.step();
        (step.current, step.label.clone())
    }
}

/// Progress bar driven by step increments from another thread
pub struct ProgressRenderer {
    settings: RendererSettings,
    shared: Arc<Shared>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    bar: Option<ProgressBar>,
    state: RendererState,
}

impl ProgressRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Shared::new()),
            stop_tx: None,
            handle: None,
            bar: None,
            state: RendererState::Idle,
        }
    }

    /// Spawn the render loop; returns without waiting for the first paint
    ///
    /// Starting a renderer that is already running or stopped does nothing.
    pub fn start(&mut self, total_steps: u64, longest_label_length: usize) -> io::Result<()> {
        if self.state != RendererState::Idle {
            log::debug!("Progress renderer already {:?}, not starting", self.state);
            return Ok(());
        }

        self.shared.size(total_steps);
        let column = column_width(total_steps, longest_label_length);
        let bar = build_bar(total_steps, self.settings.hidden);
        let (stop_tx, stop_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let tick = self.settings.tick;
        let render_bar = bar.clone();

        let handle = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || render_loop(&shared, &render_bar, &stop_rx, tick, column))?;

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        self.bar = Some(bar);
        self.state = RendererState::Running;
        Ok(())
    }

    /// Advance one step and show `label` as the current task
    ///
    /// Safe before `start`: the update is picked up by the first tick.
    pub fn increment_step(&self, label: &str) {
        self.shared.advance(label);
        if !self.settings.pacing.is_zero() {
            thread::sleep(self.settings.pacing);
        }
    }

    /// Signal the render loop to exit
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already be gone; nothing to signal then
            let _ = stop_tx.send(());
        }
        self.state = RendererState::Stopped;
    }

    /// Wait for the render loop to exit
    ///
    /// Implies `stop`, so joining a running renderer cannot hang.
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Progress renderer thread panicked");
            }
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Whether the render loop was ever spawned
    pub fn was_started(&self) -> bool {
        self.bar.is_some()
    }

    /// Run `f` with the bar cleared, so other output does not tear it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    pub fn current_step(&self) -> u64 {
        self.shared.snapshot().0
    }

    /// Total steps, once sized by `start`
    pub fn total_steps(&self) -> Option<u64> {
        match self.shared.total.load(Ordering::Acquire) {
            UNSIZED => None,
            total => Some(total),
        }
    }

    pub fn current_label(&self) -> String {
        self.shared.snapshot().1
    }
}

impl Drop for ProgressRenderer {
    fn drop(&mut self) {
        self.join();
    }
}

fn render_loop(
    shared: &Shared,
    bar: &ProgressBar,
    stop_rx: &Receiver<()>,
    tick: Duration,
    column: usize,
) {
    loop {
        paint(shared, bar, column);
        match stop_rx.recv_timeout(tick) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    paint(shared, bar, column);
    bar.finish();
}

fn paint(shared: &Shared, bar: &ProgressBar, column: usize) {
    let (current, label) = shared.snapshot();
    let total = shared.total.load(Ordering::Acquire);
    bar.set_prefix(step_label(current, total, &label, column));
    bar.set_position(current);
    bar.tick();
}

fn build_bar(total_steps: u64, hidden: bool) -> ProgressBar {
    let target = if hidden {
        ProgressDrawTarget::hidden()
    } else {
        ProgressDrawTarget::stderr()
    };
    let bar = ProgressBar::with_draw_target(Some(total_steps), target);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    bar.set_style(style);
    bar
}

fn digits(n: u64) -> usize {
    n.to_string().len()
}

/// Width of the left column: `NN/NN ` plus the longest label and a gap
fn column_width(total_steps: u64, longest_label_length: usize) -> usize {
    longest_label_length + digits(total_steps) * 2 + 2
}

/// `03/12 role : task`, padded to the column width
fn step_label(current: u64, total: u64, label: &str, column: usize) -> String {
    if label.is_empty() {
        return " ".repeat(column);
    }
    let width = digits(total);
    let text = format!("{current:0width$}/{total} {label}");
    format!("{text:<column$}")
}
