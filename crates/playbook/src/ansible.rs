//! `ansible-playbook` engine adapter
//!
//! Each run writes a single-play playbook and an `ansible.cfg` into a scoped
//! temporary directory, spawns `ansible-playbook` against `localhost`, and
//! translates its default stdout format into [`LifecycleCallback`] events.

use crate::callback::LifecycleCallback;
use crate::engine::{Engine, EngineError, InterruptCheck, never_interrupted};
use crate::error::{Error, Result};
use crate::types::{PlayDescription, RunOptions, Task, TaskResult};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Default engine executable
pub const DEFAULT_PROGRAM: &str = "ansible-playbook";

const PLAYBOOK_FILE: &str = "playbook.yml";
const CONFIG_FILE: &str = "ansible.cfg";
const STDERR_FILE: &str = "stderr.log";
const STDERR_TAIL_LINES: usize = 10;

/// Host failures already reported per task
const EXIT_HOST_FAILED: i32 = 2;

/// Engine backed by the `ansible-playbook` executable
#[derive(Debug, Clone)]
pub struct AnsiblePlaybook {
    program: PathBuf,
    interrupted: InterruptCheck,
}

impl AnsiblePlaybook {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            interrupted: never_interrupted,
        }
    }

    /// Find `program` in PATH
    pub fn locate(program: &str) -> Result<Self> {
        let path = which::which(program).map_err(|_| {
            Error::Configuration(format!(
                "{program} not found, please check your Ansible installation"
            ))
        })?;
        log::debug!("Using engine at {}", path.display());
        Ok(Self::new(path))
    }

    /// Kill the engine as soon as `check` reports an interrupt
    pub fn with_interrupt_check(mut self, check: InterruptCheck) -> Self {
        self.interrupted = check;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, workspace: &Workspace, options: &RunOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-i", "localhost,", "-c", options.connection.as_str()])
            .args(["--forks", &options.forks.to_string()]);
        if options.check {
            cmd.arg("--check");
        }
        if options.privilege_escalation {
            cmd.arg("--become");
        }
        if options.verbosity > 0 {
            cmd.arg(format!("-{}", "v".repeat(usize::from(options.verbosity))));
        }
        cmd.arg(&workspace.playbook)
            .current_dir(workspace.dir.path())
            .env("ANSIBLE_CONFIG", &workspace.config)
            .env("ANSIBLE_NOCOLOR", "1")
            .env("ANSIBLE_FORCE_COLOR", "0")
            .env("ANSIBLE_STDOUT_CALLBACK", "default");
        cmd
    }
}

impl Engine for AnsiblePlaybook {
    fn run(
        &self,
        play: &PlayDescription,
        options: &RunOptions,
        callback: &mut dyn LifecycleCallback,
    ) -> std::result::Result<(), EngineError> {
        let workspace = Workspace::prepare(play, options)
            .map_err(|e| EngineError::new(format!("Failed to prepare engine files: {e}")))?;
        let stderr = File::create(&workspace.stderr_log)
            .map_err(|e| EngineError::new(format!("Failed to create engine log: {e}")))?;

        let mut cmd = self.command(&workspace, options);
        log::debug!("Running {:?}", cmd);
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                EngineError::new(format!("Failed to execute {}: {e}", self.program.display()))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::new("Engine stdout was not captured"))?;

        let mut parser = OutputParser::new(play.ignore_errors);
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to read engine output: {}", e);
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            log::debug!(target: "ansible", "{}", line);
            parser.feed(line, callback);

            if (self.interrupted)() {
                // The child usually got the same SIGINT; make sure it is gone
                let _ = child.kill();
                break;
            }
        }
        parser.finish(callback);

        let status = child
            .wait()
            .map_err(|e| EngineError::new(format!("Failed to wait for engine: {e}")))?;
        workspace.log_stderr();

        if (self.interrupted)() {
            return Err(EngineError::new("Engine interrupted"));
        }

        match status.code() {
            Some(0) => Ok(()),
            Some(EXIT_HOST_FAILED) if parser.failures() > 0 => Ok(()),
            Some(code) => Err(EngineError::new(format!(
                "{} exited with status {}: {}",
                self.program.display(),
                code,
                workspace.stderr_tail()
            ))),
            None => Err(EngineError::new(format!(
                "{} was terminated by a signal",
                self.program.display()
            ))),
        }
    }
}

/// Files for one engine invocation; removed when dropped
struct Workspace {
    dir: TempDir,
    playbook: PathBuf,
    config: PathBuf,
    stderr_log: PathBuf,
}

impl Workspace {
    fn prepare(play: &PlayDescription, options: &RunOptions) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("i3-xfce-").tempdir()?;
        let playbook = dir.path().join(PLAYBOOK_FILE);
        let config = dir.path().join(CONFIG_FILE);
        let stderr_log = dir.path().join(STDERR_FILE);

        let yaml = play
            .to_playbook_yaml()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&playbook, yaml)?;
        fs::write(&config, engine_config(&options.roles_path))?;

        Ok(Self {
            dir,
            playbook,
            config,
            stderr_log,
        })
    }

    fn log_stderr(&self) {
        if !log::log_enabled!(target: "ansible", log::Level::Debug) {
            return;
        }
        let content = fs::read_to_string(&self.stderr_log).unwrap_or_default();
        for line in content.lines() {
            log::debug!(target: "ansible", "stderr: {}", line);
        }
    }

    fn stderr_tail(&self) -> String {
        let content = fs::read_to_string(&self.stderr_log).unwrap_or_default();
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return "no error output".to_string();
        }
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        lines[start..].join("\n")
    }
}

fn engine_config(roles_path: &Path) -> String {
    format!(
        "[defaults]\n\
         roles_path = {}\n\
         retry_files_enabled = False\n\
         nocolor = True\n",
        roles_path.display()
    )
}

// ============================================================================
// Output parsing
// ============================================================================

/// Marker printed right after a failure the task tolerates
const IGNORING: &str = "...ignoring";

/// Turns default-callback stdout lines into lifecycle events
///
/// A failure is held back for one line: the engine prints `...ignoring`
/// after it when the task itself tolerates errors.
#[derive(Debug)]
struct OutputParser {
    ignore_errors: bool,
    current: Task,
    pending_failure: Option<TaskResult>,
    failures: usize,
    finished: bool,
}

impl OutputParser {
    fn new(ignore_errors: bool) -> Self {
        Self {
            ignore_errors,
            current: Task::default(),
            pending_failure: None,
            failures: 0,
            finished: false,
        }
    }

    /// Failures that were not tolerated
    fn failures(&self) -> usize {
        self.failures
    }

    /// Emit a failure still held back at end of output
    fn finish(&mut self, callback: &mut dyn LifecycleCallback) {
        self.flush_failure(false, callback);
    }

    fn flush_failure(&mut self, ignored: bool, callback: &mut dyn LifecycleCallback) {
        if let Some(result) = self.pending_failure.take() {
            let ignore_errors = ignored || self.ignore_errors;
            if !ignore_errors {
                self.failures += 1;
            }
            callback.on_task_failed(&result, ignore_errors);
        }
    }

    fn feed(&mut self, line: &str, callback: &mut dyn LifecycleCallback) {
        if self.finished {
            return;
        }
        if self.pending_failure.is_some() {
            let ignored = line.trim() == IGNORING;
            self.flush_failure(ignored, callback);
            if ignored {
                return;
            }
        }
        if line.starts_with("PLAY RECAP") {
            self.finished = true;
        } else if let Some(rest) = line.strip_prefix("PLAY ") {
            if let Some(name) = header_name(rest) {
                callback.on_play_start(name);
            }
        } else if let Some(rest) = line.strip_prefix("TASK ") {
            if let Some(name) = header_name(rest) {
                self.current = parse_task(name);
                callback.on_task_start(&self.current);
            }
        } else if let Some(rest) = line.strip_prefix("RUNNING HANDLER ") {
            if let Some(name) = header_name(rest) {
                self.current = parse_task(name);
            }
        } else if let Some(rest) = line.strip_prefix("ok: ") {
            if let Some((host, _)) = host_and_payload(rest) {
                callback.on_task_ok(&TaskResult::new(self.current.clone(), host));
            }
        } else if let Some(rest) = line.strip_prefix("changed: ") {
            if let Some((host, _)) = host_and_payload(rest) {
                let mut result = TaskResult::new(self.current.clone(), host);
                result.changed = true;
                callback.on_task_ok(&result);
            }
        } else if let Some(rest) = line.strip_prefix("skipping: ") {
            if let Some((host, payload)) = host_and_payload(rest) {
                let mut result = TaskResult::new(self.current.clone(), host);
                result.message = failure_message(payload);
                callback.on_task_skipped(&result);
            }
        } else if let Some(rest) = line
            .strip_prefix("fatal: ")
            .or_else(|| line.strip_prefix("failed: "))
        {
            if let Some((host, payload)) = host_and_payload(rest) {
                let mut result = TaskResult::new(self.current.clone(), host);
                result.message = failure_message(payload);
                self.pending_failure = Some(result);
            }
        }
    }
}

/// `[name] *****` -> `name`
fn header_name(rest: &str) -> Option<&str> {
    rest.trim_end_matches('*')
        .trim_end()
        .strip_prefix('[')?
        .strip_suffix(']')
}

/// `role : name` -> task in role, anything else -> plain task
fn parse_task(name: &str) -> Task {
    match name.split_once(" : ") {
        Some((role, task)) => Task::in_role(role, task),
        None => Task::new(name),
    }
}

/// `[localhost]: FAILED! => {...}` -> (`localhost`, `{...}`)
fn host_and_payload(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.strip_prefix('[')?;
    let (host, tail) = rest.split_once(']')?;
    let payload = tail.split_once("=> ").map_or("", |(_, p)| p.trim());
    Some((host, payload))
}

fn failure_message(payload: &str) -> Option<String> {
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => value
            .get("msg")
            .or_else(|| value.get("skip_reason"))
            .and_then(|msg| msg.as_str())
            .map(str::to_string),
        Err(_) => Some(payload.to_string()),
    }
}
