//! Two-pass play orchestration
//!
//! 1. Resolve the unprivileged user behind the elevated process
//! 2. Count pass - run the play in check mode, errors ignored, to size the UI
//! 3. Apply pass - run the play for real (or in check mode on request)
//!    with a live progress bar
//! 4. Stop the progress bar on every exit path, then reduce to success/failure

use crate::callback::{ExecutionCallback, TaskCounter};
use crate::engine::{Engine, EngineError, InterruptCheck, never_interrupted};
use crate::error::{Error, Result, TaskExecutionError};
use crate::identity::IdentitySource;
use crate::progress::{RendererSettings, RendererState};
use crate::types::{Action, PlayDescription, RunOptions, TaskTally};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Settings shared by both passes
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Directory holding one role directory per action
    pub roles_root: PathBuf,
    pub verbosity: u8,
    pub renderer: RendererSettings,
}

impl OrchestratorSettings {
    pub fn new(roles_root: impl Into<PathBuf>) -> Self {
        Self {
            roles_root: roles_root.into(),
            verbosity: 0,
            renderer: RendererSettings::default(),
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Counting,
    Counted,
    Executing,
    Succeeded,
    Failed,
}

/// Summary of a successful apply pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub action: Action,
    pub check_mode: bool,
    pub total_steps: u64,
    pub completed_steps: u64,
    pub ok: usize,
    pub changed: usize,
    pub skipped: usize,
}

/// How the apply pass left its progress renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOutcome {
    pub started: bool,
    pub state: RendererState,
}

/// Runs the count pass and the apply pass for one action
pub struct Orchestrator<E, I> {
    engine: E,
    identity: I,
    settings: OrchestratorSettings,
    interrupted: InterruptCheck,
    phase: Phase,
    renderer: Option<RendererOutcome>,
}

impl<E: Engine, I: IdentitySource> Orchestrator<E, I> {
    pub fn new(engine: E, identity: I, settings: OrchestratorSettings) -> Self {
        Self {
            engine,
            identity,
            settings,
            interrupted: never_interrupted,
            phase: Phase::NotStarted,
            renderer: None,
        }
    }

    /// Abort between passes and after the apply pass when `check` fires
    pub fn with_interrupt_check(mut self, check: InterruptCheck) -> Self {
        self.interrupted = check;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Renderer of the last apply pass; `None` when no apply pass ran
    pub fn renderer_outcome(&self) -> Option<RendererOutcome> {
        self.renderer
    }

    /// Apply `action` to `roles`, optionally in check mode
    pub fn execute_action(
        &mut self,
        action: Action,
        roles: &[String],
        check_mode: bool,
    ) -> Result<RunReport> {
        self.phase = Phase::NotStarted;
        self.renderer = None;
        log::debug!("Executing the {} action", action);

        let result = self.run_passes(action, roles, check_mode);
        self.phase = if result.is_ok() {
            Phase::Succeeded
        } else {
            Phase::Failed
        };
        result
    }

    fn run_passes(
        &mut self,
        action: Action,
        roles: &[String],
        check_mode: bool,
    ) -> Result<RunReport> {
        let user = self.real_user()?;
        let vars = BTreeMap::from([
            ("action".to_string(), action.to_string()),
            ("remote_user".to_string(), user),
        ]);
        let roles_path = self.settings.roles_root.join(action.as_str());

        self.phase = Phase::Counting;
        let tally = self.count(roles, vars.clone(), roles_path.clone())?;
        self.phase = Phase::Counted;
        log::info!("{} tasks are going to be executed", tally.total_tasks);

        if (self.interrupted)() {
            return Err(Error::Interrupted);
        }

        self.phase = Phase::Executing;
        self.apply(action, roles, vars, roles_path, tally, check_mode)
    }

    fn real_user(&self) -> Result<String> {
        match self.identity.real_user() {
            Some(user) if !user.is_empty() => Ok(user),
            _ => {
                log::debug!("No user behind the elevated process, not started using sudo");
                Err(Error::Permission(
                    "This program must be run using sudo".to_string(),
                ))
            }
        }
    }

    fn count(
        &self,
        roles: &[String],
        vars: BTreeMap<String, String>,
        roles_path: PathBuf,
    ) -> Result<TaskTally> {
        let play = PlayDescription::counting(roles, vars);
        let options = RunOptions::counting(roles_path, self.settings.verbosity);
        let mut counter = TaskCounter::new();

        self.engine
            .run(&play, &options, &mut counter)
            .map_err(|e| self.engine_failure("count", e))?;

        Ok(counter.tally())
    }

    fn apply(
        &mut self,
        action: Action,
        roles: &[String],
        vars: BTreeMap<String, String>,
        roles_path: PathBuf,
        tally: TaskTally,
        check_mode: bool,
    ) -> Result<RunReport> {
        let play = PlayDescription::executing(roles, vars);
        let options = RunOptions::executing(roles_path, self.settings.verbosity, check_mode);
        let mut callback = ExecutionCallback::new(tally, self.settings.renderer.clone());

        let outcome = self.engine.run(&play, &options, &mut callback);

        let renderer = callback.progress_renderer_mut();
        renderer.stop();
        renderer.join();
        self.renderer = Some(RendererOutcome {
            started: renderer.was_started(),
            state: renderer.state(),
        });

        if (self.interrupted)() {
            return Err(Error::Interrupted);
        }
        outcome.map_err(|e| self.engine_failure("apply", e))?;

        if callback.failed() {
            return Err(TaskExecutionError::TaskFailure {
                failed_tasks: callback.failed_tasks().to_vec(),
                verbose: self.settings.verbosity > 0,
            }
            .into());
        }

        Ok(RunReport {
            action,
            check_mode,
            total_steps: tally.total_tasks,
            completed_steps: callback.progress_renderer().current_step(),
            ok: callback.ok_count(),
            changed: callback.changed_count(),
            skipped: callback.skipped_count(),
        })
    }

    fn engine_failure(&self, pass: &str, e: EngineError) -> Error {
        log::debug!("Engine failed during the {} pass: {}", pass, e);
        if (self.interrupted)() {
            return Error::Interrupted;
        }
        TaskExecutionError::Engine { message: e.message }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::LifecycleCallback;
    use crate::identity::FixedIdentity;

    struct FailingEngine;

    impl Engine for FailingEngine {
        fn run(
            &self,
            _play: &PlayDescription,
            _options: &RunOptions,
            _callback: &mut dyn LifecycleCallback,
        ) -> std::result::Result<(), EngineError> {
            Err(EngineError::new("boom"))
        }
    }

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            renderer: RendererSettings::hidden(),
            ..OrchestratorSettings::new("/roles")
        }
    }

    #[test]
    fn test_phase_starts_not_started() {
        let orchestrator = Orchestrator::new(FailingEngine, FixedIdentity::user("alice"), settings());
        assert_eq!(orchestrator.phase(), Phase::NotStarted);
    }

    #[test]
    fn test_count_failure_marks_failed() {
        let mut orchestrator =
            Orchestrator::new(FailingEngine, FixedIdentity::user("alice"), settings());
        let err = orchestrator
            .execute_action(Action::Install, &["i3".to_string()], false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TaskExecution(TaskExecutionError::Engine { ref message }) if message == "boom"
        ));
        assert_eq!(orchestrator.phase(), Phase::Failed);
    }

    #[test]
    fn test_empty_user_is_permission_error() {
        let mut orchestrator =
            Orchestrator::new(FailingEngine, FixedIdentity::user(""), settings());
        let err = orchestrator
            .execute_action(Action::Uninstall, &[], false)
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
    }

    fn interrupted() -> bool {
        true
    }

    #[test]
    fn test_interrupt_turns_engine_failure_into_interrupted() {
        let mut orchestrator =
            Orchestrator::new(FailingEngine, FixedIdentity::user("alice"), settings())
                .with_interrupt_check(interrupted);
        let err = orchestrator
            .execute_action(Action::Install, &[], false)
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted));
    }
}
