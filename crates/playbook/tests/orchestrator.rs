//! End-to-end orchestration scenarios against a scripted engine

use playbook::{
    Action, Engine, EngineError, Error, FixedIdentity, LifecycleCallback, Orchestrator,
    OrchestratorSettings, Phase, PlayDescription, RendererOutcome, RendererSettings,
    RendererState, RunOptions, Task, TaskExecutionError, TaskResult,
};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Raised by `Event::Interrupt`, read by `interrupt_raised`
static INTERRUPT: AtomicBool = AtomicBool::new(false);

fn interrupt_raised() -> bool {
    INTERRUPT.load(Ordering::SeqCst)
}

const STOPPED_AFTER_START: Option<RendererOutcome> = Some(RendererOutcome {
    started: true,
    state: RendererState::Stopped,
});

/// One scripted engine event
#[derive(Clone)]
enum Event {
    PlayStart,
    Start(&'static str),
    Ok(&'static str),
    Failed(&'static str, &'static str),
    /// Operator presses Ctrl-C
    Interrupt,
}

/// What a pass does: emit events, then finish or crash
#[derive(Clone)]
struct Pass {
    events: Vec<Event>,
    crash: Option<&'static str>,
}

impl Pass {
    fn ok(events: Vec<Event>) -> Self {
        Self {
            events,
            crash: None,
        }
    }

    fn crashing(events: Vec<Event>, message: &'static str) -> Self {
        Self {
            events,
            crash: Some(message),
        }
    }
}

#[derive(Debug, Clone)]
struct Call {
    ignore_errors: bool,
    check: bool,
    roles: Vec<String>,
    roles_path: String,
    remote_user: Option<String>,
}

struct ScriptedEngine {
    passes: Vec<Pass>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedEngine {
    fn new(passes: Vec<Pass>) -> Self {
        Self {
            passes,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Engine for ScriptedEngine {
    fn run(
        &self,
        play: &PlayDescription,
        options: &RunOptions,
        callback: &mut dyn LifecycleCallback,
    ) -> Result<(), EngineError> {
        let index = self.calls.borrow().len();
        self.calls.borrow_mut().push(Call {
            ignore_errors: play.ignore_errors,
            check: options.check,
            roles: play.roles.clone(),
            roles_path: options.roles_path.display().to_string(),
            remote_user: play.vars.get("remote_user").cloned(),
        });

        let pass = self.passes[index].clone();
        let mut current = Task::default();
        for event in pass.events {
            match event {
                Event::PlayStart => callback.on_play_start("i3-xfce"),
                Event::Start(name) => {
                    current = Task::new(name);
                    callback.on_task_start(&current);
                }
                Event::Ok(host) => callback.on_task_ok(&TaskResult::new(current.clone(), host)),
                Event::Failed(host, msg) => callback.on_task_failed(
                    &TaskResult::new(current.clone(), host).with_message(msg),
                    play.ignore_errors,
                ),
                Event::Interrupt => INTERRUPT.store(true, Ordering::SeqCst),
            }
        }

        match pass.crash {
            Some(message) => Err(EngineError::new(message)),
            None => Ok(()),
        }
    }
}

fn five_tasks(failing: Option<usize>) -> Vec<Event> {
    let names = ["task-01", "task-2", "task-003", "t4", "task-05"];
    let mut events = vec![Event::PlayStart];
    for (i, name) in names.into_iter().enumerate() {
        events.push(Event::Start(name));
        if failing == Some(i) {
            events.push(Event::Failed("localhost", "package not found"));
        } else {
            events.push(Event::Ok("localhost"));
        }
    }
    events
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        renderer: RendererSettings::hidden(),
        ..OrchestratorSettings::new("/usr/share/i3-xfce/roles")
    }
}

fn roles() -> Vec<String> {
    vec!["i3".to_string(), "xfce".to_string()]
}

#[test]
fn missing_identity_fails_before_any_pass() {
    let engine = ScriptedEngine::new(vec![]);
    let mut orchestrator = Orchestrator::new(&engine, FixedIdentity::none(), settings());

    let err = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap_err();

    assert!(matches!(err, Error::Permission(_)));
    assert!(engine.calls().is_empty());
    assert_eq!(orchestrator.renderer_outcome(), None);
}

#[test]
fn successful_run_sizes_and_completes_progress() {
    let engine = ScriptedEngine::new(vec![
        Pass::ok(five_tasks(Some(1))),
        Pass::ok(five_tasks(None)),
    ]);
    let mut orchestrator =
        Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let report = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap();

    assert_eq!(report.total_steps, 5);
    assert_eq!(report.completed_steps, 5);
    assert_eq!(report.ok, 5);
    assert_eq!(orchestrator.phase(), Phase::Succeeded);
    assert_eq!(orchestrator.renderer_outcome(), STOPPED_AFTER_START);

    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ignore_errors);
    assert!(calls[0].check);
    assert!(!calls[1].ignore_errors);
    assert!(!calls[1].check);
    assert_eq!(calls[1].roles, roles());
    assert_eq!(calls[1].roles_path, "/usr/share/i3-xfce/roles/install");
    assert_eq!(calls[1].remote_user.as_deref(), Some("alice"));
}

#[test]
fn dry_run_applies_in_check_mode() {
    let engine = ScriptedEngine::new(vec![
        Pass::ok(five_tasks(None)),
        Pass::ok(five_tasks(None)),
    ]);
    let mut orchestrator = Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let report = orchestrator
        .execute_action(Action::Uninstall, &roles(), true)
        .unwrap();

    assert!(report.check_mode);
    let calls = engine.calls();
    assert!(calls[1].check);
    assert_eq!(calls[1].roles_path, "/usr/share/i3-xfce/roles/uninstall");
}

#[test]
fn failed_task_fails_run_after_pass_completes() {
    let engine = ScriptedEngine::new(vec![
        Pass::ok(five_tasks(None)),
        Pass::ok(five_tasks(Some(2))),
    ]);
    let mut orchestrator =
        Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let err = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap_err();

    match err {
        Error::TaskExecution(TaskExecutionError::TaskFailure { failed_tasks, .. }) => {
            assert_eq!(failed_tasks, vec!["task-003".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(orchestrator.phase(), Phase::Failed);
    assert_eq!(engine.calls().len(), 2);
    assert_eq!(orchestrator.renderer_outcome(), STOPPED_AFTER_START);
}

#[test]
fn count_pass_crash_skips_apply_pass() {
    let engine = ScriptedEngine::new(vec![Pass::crashing(vec![], "ansible exploded")]);
    let mut orchestrator =
        Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let err = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::TaskExecution(TaskExecutionError::Engine { ref message }) if message == "ansible exploded"
    ));
    assert_eq!(engine.calls().len(), 1);
    assert_eq!(orchestrator.phase(), Phase::Failed);
    // No apply pass, so no renderer was ever created or started
    assert_eq!(orchestrator.renderer_outcome(), None);
}

#[test]
fn apply_pass_crash_still_returns_after_progress_started() {
    let mut partial = five_tasks(None);
    partial.truncate(4);
    let engine = ScriptedEngine::new(vec![
        Pass::ok(five_tasks(None)),
        Pass::crashing(partial, "connection lost"),
    ]);
    let mut orchestrator =
        Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let err = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap_err();

    assert!(err.is_task_execution());
    assert_eq!(err.to_string(), "connection lost");
    assert_eq!(orchestrator.phase(), Phase::Failed);
    assert_eq!(orchestrator.renderer_outcome(), STOPPED_AFTER_START);
}

#[test]
fn interrupt_during_apply_pass_stops_progress() {
    let mut interrupted = five_tasks(None);
    interrupted.insert(3, Event::Interrupt);
    let engine = ScriptedEngine::new(vec![
        Pass::ok(five_tasks(None)),
        Pass::crashing(interrupted, "killed"),
    ]);
    let mut orchestrator = Orchestrator::new(&engine, FixedIdentity::user("alice"), settings())
        .with_interrupt_check(interrupt_raised);

    let err = orchestrator
        .execute_action(Action::Install, &roles(), false)
        .unwrap_err();

    assert!(matches!(err, Error::Interrupted));
    assert_eq!(orchestrator.phase(), Phase::Failed);
    assert_eq!(orchestrator.renderer_outcome(), STOPPED_AFTER_START);
}

#[test]
fn empty_role_list_runs_both_passes() {
    let engine = ScriptedEngine::new(vec![
        Pass::ok(vec![Event::PlayStart]),
        Pass::ok(vec![Event::PlayStart]),
    ]);
    let mut orchestrator =
        Orchestrator::new(&engine, FixedIdentity::user("alice"), settings());

    let report = orchestrator
        .execute_action(Action::Install, &[], false)
        .unwrap();

    assert_eq!(report.total_steps, 0);
    assert_eq!(report.completed_steps, 0);
}
