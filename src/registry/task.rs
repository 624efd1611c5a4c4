// src/registry/task.rs

use std::fmt;
use std::sync::Arc;

use crate::compose::Step;
use crate::registry::action::Action;
use crate::types::TaskName;

/// What a registered task does when run.
#[derive(Clone)]
pub enum TaskKind {
    /// Directly executable unit of work.
    Leaf(Arc<dyn Action>),
    /// Composition of other registered tasks.
    Composite(Step),
}

/// A registered task. Immutable once registered.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    kind: TaskKind,
    description: Option<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Task");
        d.field("name", &self.name);
        match &self.kind {
            TaskKind::Leaf(action) => d.field("action", &action.describe()),
            TaskKind::Composite(step) => d.field("step", step),
        };
        d.finish()
    }
}

impl Task {
    pub fn leaf(name: impl Into<TaskName>, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Leaf(action),
            description: None,
        }
    }

    pub fn composite(name: impl Into<TaskName>, step: Step) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Composite(step),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TaskKind::Leaf(_))
    }

    /// One-line summary: the action description for leaves, the step tree
    /// for composites.
    pub fn summary(&self) -> String {
        match &self.kind {
            TaskKind::Leaf(action) => action.describe(),
            TaskKind::Composite(step) => step.to_string(),
        }
    }
}
