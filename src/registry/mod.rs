// src/registry/mod.rs

//! Task registry.
//!
//! The registry is built once at startup (from the config file, or by hand in
//! tests), then frozen behind an `Arc` and shared by the runner and the watch
//! reactor. There is no unregistration.
//!
//! - [`action`] defines the [`Action`] trait behind leaf tasks.
//! - [`task`] defines the registered [`Task`] record.
//! - [`from_config`] turns a validated config into a populated registry.

pub mod action;
pub mod from_config;
pub mod task;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::compose::{registration_order, Step};
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

pub use action::{action_fn, Action, ActionFuture};
pub use from_config::build_registry_from_config;
pub use task::{Task, TaskKind};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf task.
    ///
    /// Fails with [`PipelineError::DuplicateTask`] if the name is taken; the
    /// existing task is left in place.
    pub fn register(&mut self, name: impl Into<TaskName>, action: Arc<dyn Action>) -> Result<()> {
        self.insert(Task::leaf(name, action))
    }

    /// Register a composite task.
    ///
    /// Every task the step references must already be registered, which
    /// rules out cycles as long as composites are registered one at a time.
    pub fn register_composite(&mut self, name: impl Into<TaskName>, step: Step) -> Result<()> {
        self.insert(Task::composite(name, step))
    }

    /// Register a batch of composites that may reference each other, in
    /// dependency order.
    ///
    /// Fails with [`PipelineError::TaskCycle`] before registering anything if
    /// the batch references itself in a loop.
    pub fn register_composites(&mut self, defs: BTreeMap<TaskName, Step>) -> Result<()> {
        self.register_described_composites(defs, |_| None)
    }

    /// [`register_composites`](Self::register_composites) with a description
    /// looked up per task name.
    pub fn register_described_composites(
        &mut self,
        defs: BTreeMap<TaskName, Step>,
        description: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        let order = registration_order(&defs)?;
        let mut defs = defs;
        for name in order {
            if let Some(step) = defs.remove(&name) {
                let desc = description(&name);
                self.insert(Task::composite(name, step).with_description(desc))?;
            }
        }
        Ok(())
    }

    /// Register a fully built [`Task`] (leaf or composite).
    pub fn insert(&mut self, task: Task) -> Result<()> {
        let name = task.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(PipelineError::DuplicateTask(name));
        }
        if let TaskKind::Composite(step) = task.kind() {
            self.check_composite(&name, step)?;
        }
        debug!(task = %name, leaf = task.is_leaf(), "registered task");
        self.tasks.insert(name, Arc::new(task));
        Ok(())
    }

    /// Look up a task by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered task names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render the task and everything under it as an indented tree.
    ///
    /// ```text
    /// build: series
    ///   clean: clean app/dist
    ///   parallel
    ///     styles: sh -c "sass ..."
    ///     scripts: ...
    /// ```
    pub fn describe(&self, name: &str) -> Result<String> {
        let task = self.resolve(name)?;
        let mut out = String::new();
        self.describe_task(&task, 0, &mut out);
        Ok(out)
    }

    fn describe_task(&self, task: &Task, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match task.kind() {
            TaskKind::Leaf(action) => {
                let _ = writeln!(out, "{indent}{}: {}", task.name(), action.describe());
            }
            TaskKind::Composite(step) => {
                let _ = write!(out, "{indent}{}: ", task.name());
                self.describe_step(step, depth, out, true);
            }
        }
    }

    fn describe_step(&self, step: &Step, depth: usize, out: &mut String, inline: bool) {
        let indent = if inline { String::new() } else { "  ".repeat(depth) };
        match step {
            Step::Task(name) => match self.tasks.get(name) {
                Some(task) => self.describe_task(task, depth, out),
                None => {
                    let _ = writeln!(out, "{indent}{name}: <unregistered>");
                }
            },
            Step::Series(members) | Step::Parallel(members) => {
                let label = if matches!(step, Step::Series(_)) {
                    "series"
                } else {
                    "parallel"
                };
                let _ = writeln!(out, "{indent}{label}");
                for m in members {
                    self.describe_step(m, depth + 1, out, false);
                }
            }
        }
    }

    fn check_composite(&self, name: &str, step: &Step) -> Result<()> {
        step.validate_non_empty()
            .map_err(|reason| PipelineError::InvalidComposite {
                name: name.to_string(),
                reason,
            })?;

        for member in step.referenced_tasks() {
            if member == name {
                return Err(PipelineError::TaskCycle(format!(
                    "composite task '{name}' references itself"
                )));
            }
            if !self.tasks.contains_key(member) {
                return Err(PipelineError::UnknownTask(member.to_string()));
            }
        }
        Ok(())
    }
}
