//! # Playbook
//!
//! Two-pass playbook orchestration with live progress reporting.
//!
//! The crate drives an external task-runner (an [`Engine`]) twice for a
//! single play: a dry "count" pass that sizes the progress display, then the
//! real "apply" pass whose task outcomes decide success or failure.
//!
//! ## Core Concepts
//!
//! - **PlayDescription**: what to run (target, roles, error tolerance)
//! - **RunOptions**: how to run it (connection, forks, check mode, verbosity)
//! - **LifecycleCallback**: events the engine emits while a play runs
//! - **TaskCounter**: callback for the count pass
//! - **ExecutionCallback**: callback for the real pass, owns a [`ProgressRenderer`]
//! - **Orchestrator**: ties both passes together
//!
//! ## Example
//!
//! ```ignore
//! use playbook::{Action, AnsiblePlaybook, Orchestrator, OrchestratorSettings};
//!
//! let engine = AnsiblePlaybook::locate("ansible-playbook")?;
//! let mut orchestrator = Orchestrator::new(engine, identity, OrchestratorSettings::new(roles_dir));
//! let report = orchestrator.execute_action(Action::Install, &roles, false)?;
//! println!("{} tasks applied", report.completed_steps);
//! ```
//!
//! ## Provider Traits
//!
//! - [`Engine`]: runs a play and reports lifecycle events
//! - [`IdentitySource`]: resolves the unprivileged user behind the elevated process
//!
//! Both are injected so the orchestrator can be exercised without a real
//! task-runner or a real `sudo` session.

pub mod ansible;
pub mod callback;
pub mod engine;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod progress;
pub mod types;

// Re-export main types at crate root
pub use ansible::AnsiblePlaybook;
pub use callback::{ExecutionCallback, LifecycleCallback, TaskCounter};
pub use engine::{Engine, EngineError, InterruptCheck};
pub use error::{Error, Result, TaskExecutionError};
pub use identity::{FixedIdentity, IdentitySource};
pub use orchestrator::{Orchestrator, OrchestratorSettings, Phase, RendererOutcome, RunReport};
pub use progress::{ProgressRenderer, RendererSettings, RendererState};
pub use types::{
    Action, Connection, PlayDescription, RunOptions, TargetSelector, Task, TaskResult, TaskTally,
};
