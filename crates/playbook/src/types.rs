//! Core types for a two-pass playbook run

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Operation applied by the roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Uninstall,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host pattern a play is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelector {
    /// The local machine only
    #[default]
    Localhost,
}

impl TargetSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Localhost => "localhost",
        }
    }
}

/// Immutable description of a single play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayDescription {
    pub name: String,
    pub target: TargetSelector,
    pub gather_facts: bool,
    /// Keep going when a task fails
    pub ignore_errors: bool,
    /// Role identifiers, in execution order
    pub roles: Vec<String>,
    /// Play-level variables made visible to every role
    pub vars: BTreeMap<String, String>,
}

/// Play name shown by the engine
pub const PLAY_NAME: &str = "i3-xfce";

impl PlayDescription {
    /// Play for the count pass: task failures never abort counting
    pub fn counting(roles: &[String], vars: BTreeMap<String, String>) -> Self {
        Self::build(roles, vars, true)
    }

    /// Play for the apply pass: task failures are reported
    pub fn executing(roles: &[String], vars: BTreeMap<String, String>) -> Self {
        Self::build(roles, vars, false)
    }

    fn build(roles: &[String], vars: BTreeMap<String, String>, ignore_errors: bool) -> Self {
        Self {
            name: PLAY_NAME.to_string(),
            target: TargetSelector::Localhost,
            gather_facts: false,
            ignore_errors,
            roles: roles.to_vec(),
            vars,
        }
    }

    /// Render the play as a single-play playbook document
    pub fn to_playbook_yaml(&self) -> Result<String, serde_yaml::Error> {
        #[derive(Serialize)]
        struct PlaySource<'a> {
            name: &'a str,
            hosts: &'a str,
            gather_facts: bool,
            ignore_errors: bool,
            #[serde(skip_serializing_if = "BTreeMap::is_empty")]
            vars: &'a BTreeMap<String, String>,
            roles: &'a [String],
        }

        let source = [PlaySource {
            name: &self.name,
            hosts: self.target.as_str(),
            gather_facts: self.gather_facts,
            ignore_errors: self.ignore_errors,
            vars: &self.vars,
            roles: &self.roles,
        }];
        serde_yaml::to_string(&source)
    }
}

/// How the engine reaches the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connection {
    /// Run tasks directly on this machine
    #[default]
    Local,
}

impl Connection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
        }
    }
}

/// Options for one engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub connection: Connection,
    /// Always 1, a single local target never fans out
    pub forks: u32,
    /// Always off, the whole process already runs privileged
    pub privilege_escalation: bool,
    pub verbosity: u8,
    /// Report what would change without applying it
    pub check: bool,
    /// Directory holding the roles for the current action
    pub roles_path: PathBuf,
}

impl RunOptions {
    /// Options for the count pass
    pub fn counting(roles_path: PathBuf, verbosity: u8) -> Self {
        Self::build(roles_path, verbosity, true)
    }

    /// Options for the apply pass
    pub fn executing(roles_path: PathBuf, verbosity: u8, check: bool) -> Self {
        Self::build(roles_path, verbosity, check)
    }

    fn build(roles_path: PathBuf, verbosity: u8, check: bool) -> Self {
        Self {
            connection: Connection::Local,
            forks: 1,
            privilege_escalation: false,
            verbosity,
            check,
            roles_path,
        }
    }
}

/// A task announced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    /// Name given to the task, may be empty
    pub name: String,
    /// Role the task belongs to, if any
    pub role: Option<String>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
        }
    }

    pub fn in_role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Some(role.into()),
        }
    }

    /// Whether the task carries a display name
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// Name as displayed by the engine (`role : name`)
    pub fn display_name(&self) -> String {
        match &self.role {
            Some(role) if !role.is_empty() => format!("{} : {}", role, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Outcome of a task on one host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskResult {
    pub task: Task,
    pub host: String,
    pub changed: bool,
    /// Failure reason or skip reason reported by the engine
    pub message: Option<String>,
}

impl TaskResult {
    pub fn new(task: Task, host: impl Into<String>) -> Self {
        Self {
            task,
            host: host.into(),
            changed: false,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result of the count pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskTally {
    pub total_tasks: u64,
    pub max_name_length: usize,
}
