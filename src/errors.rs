// src/errors.rs

//! Crate-wide error types.
//!
//! - [`PipelineError`] covers setup: config loading, task registration,
//!   lookups. It is what `run` returns to `main`.
//! - [`RunError`] is the failure half of a [`RunResult`]. It is cheap to clone
//!   because the runner shares leaf outcomes between diamond-shaped branches.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task already registered: {0}")]
    DuplicateTask(TaskName),

    #[error("Task not found: {0}")]
    UnknownTask(TaskName),

    #[error("Invalid composite task '{name}': {reason}")]
    InvalidComposite { name: TaskName, reason: String },

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a task run did not succeed.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// A leaf task's action failed. `cause` is the action's own error,
    /// untouched, so callers can `downcast_ref` it.
    #[error("task '{task}' failed: {cause:#}")]
    Action {
        task: TaskName,
        cause: Arc<anyhow::Error>,
    },

    /// One or more branches of a parallel composite failed. Every branch ran
    /// to completion before this was produced.
    #[error("{} parallel branch(es) failed: {}", .failures.len(), FailureList(.failures))]
    Aggregate { failures: Vec<RunError> },

    #[error("task '{0}' is not registered")]
    UnknownTask(TaskName),
}

impl RunError {
    pub fn action(task: impl Into<TaskName>, cause: anyhow::Error) -> Self {
        RunError::Action {
            task: task.into(),
            cause: Arc::new(cause),
        }
    }

    /// Names of the leaf tasks that failed, depth first.
    pub fn failed_tasks(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_failed(&mut out);
        out
    }

    /// All leaf causes, flattened out of nested aggregates.
    pub fn causes(&self) -> Vec<&anyhow::Error> {
        match self {
            RunError::Action { cause, .. } => vec![cause.as_ref()],
            RunError::Aggregate { failures } => {
                failures.iter().flat_map(|f| f.causes()).collect()
            }
            RunError::UnknownTask(_) => Vec::new(),
        }
    }

    fn collect_failed<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            RunError::Action { task, .. } | RunError::UnknownTask(task) => out.push(task),
            RunError::Aggregate { failures } => {
                for f in failures {
                    f.collect_failed(out);
                }
            }
        }
    }
}

struct FailureList<'a>(&'a [RunError]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
