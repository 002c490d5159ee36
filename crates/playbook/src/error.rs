//! Error types for playbook orchestration

use thiserror::Error;

/// Errors surfaced by an orchestrated run
#[derive(Error, Debug)]
pub enum Error {
    /// Required external executable or setting is missing
    #[error("{0}")]
    Configuration(String),

    /// No unprivileged identity behind the elevated process
    #[error("{0}")]
    Permission(String),

    /// Either pass failed to execute or reported failed tasks
    #[error(transparent)]
    TaskExecution(#[from] TaskExecutionError),

    /// The operator interrupted the run
    #[error("interrupted by user")]
    Interrupted,
}

impl Error {
    /// Whether this error came from a pass rather than a precondition
    pub fn is_task_execution(&self) -> bool {
        matches!(self, Self::TaskExecution(_))
    }
}

/// Failures of the count or apply pass
#[derive(Error, Debug)]
pub enum TaskExecutionError {
    /// The engine itself crashed or could not be started
    #[error("{message}")]
    Engine { message: String },

    /// One or more tasks reported failure during the apply pass
    #[error("{} task(s) failed ({}), {}", .failed_tasks.len(), .failed_tasks.join(", "), failure_hint(.verbose))]
    TaskFailure {
        failed_tasks: Vec<String>,
        verbose: bool,
    },
}

fn failure_hint(verbose: &bool) -> &'static str {
    if *verbose {
        "check the logs above"
    } else {
        "run again with --verbose for details"
    }
}

/// Result type for playbook operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_message_mentions_verbose_hint() {
        let err = TaskExecutionError::TaskFailure {
            failed_tasks: vec!["i3 : Install i3".to_string()],
            verbose: false,
        };
        let msg = err.to_string();
        assert!(msg.contains("1 task(s) failed"));
        assert!(msg.contains("i3 : Install i3"));
        assert!(msg.contains("--verbose"));
    }

    #[test]
    fn test_task_failure_message_in_verbose_mode() {
        let err = TaskExecutionError::TaskFailure {
            failed_tasks: vec!["a".to_string(), "b".to_string()],
            verbose: true,
        };
        assert!(err.to_string().contains("check the logs"));
    }

    #[test]
    fn test_engine_error_preserves_message() {
        let err: Error = TaskExecutionError::Engine {
            message: "ansible crashed".to_string(),
        }
        .into();
        assert!(err.is_task_execution());
        assert_eq!(err.to_string(), "ansible crashed");
    }
}
