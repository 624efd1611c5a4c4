// src/compose/step.rs

//! The `Step` tree and the `series` / `parallel` combinators.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::TaskName;

/// A node in a composite task.
///
/// Leaves reference registered tasks by name (identity, not ownership), so the
/// same task may appear in several composites and several watch bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run the named task (leaf or composite).
    Task(TaskName),
    /// Run members strictly in order; stop at the first failure.
    Series(Vec<Step>),
    /// Start all members, wait for all of them, fail if any failed.
    Parallel(Vec<Step>),
}

/// Build a sequential step.
///
/// Directly nested series are flattened, so `series([a, series([b, c])])` and
/// `series([a, b, c])` are the same step.
pub fn series<I, S>(steps: I) -> Step
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    let mut members = Vec::new();
    for step in steps {
        match step.into() {
            Step::Series(inner) => members.extend(inner),
            other => members.push(other),
        }
    }
    Step::Series(members)
}

/// Build a concurrent step.
///
/// Directly nested parallels are flattened, like [`series`].
pub fn parallel<I, S>(steps: I) -> Step
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    let mut members = Vec::new();
    for step in steps {
        match step.into() {
            Step::Parallel(inner) => members.extend(inner),
            other => members.push(other),
        }
    }
    Step::Parallel(members)
}

impl From<&str> for Step {
    fn from(name: &str) -> Self {
        Step::Task(name.to_string())
    }
}

impl From<String> for Step {
    fn from(name: String) -> Self {
        Step::Task(name)
    }
}

impl From<&String> for Step {
    fn from(name: &String) -> Self {
        Step::Task(name.clone())
    }
}

impl Step {
    /// Every task name this step refers to, directly or through nesting.
    pub fn referenced_tasks(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Step::Task(name) => {
                out.insert(name.as_str());
            }
            Step::Series(members) | Step::Parallel(members) => {
                for m in members {
                    m.collect_refs(out);
                }
            }
        }
    }

    /// Check that no series/parallel in this tree has an empty member list.
    ///
    /// Returns a description of the first offending node.
    pub fn validate_non_empty(&self) -> Result<(), String> {
        match self {
            Step::Task(name) if name.trim().is_empty() => {
                Err("empty task name".to_string())
            }
            Step::Task(_) => Ok(()),
            Step::Series(members) if members.is_empty() => {
                Err("series() needs at least one member".to_string())
            }
            Step::Parallel(members) if members.is_empty() => {
                Err("parallel() needs at least one member".to_string())
            }
            Step::Series(members) | Step::Parallel(members) => {
                members.iter().try_for_each(Step::validate_non_empty)
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, members) = match self {
            Step::Task(name) => return f.write_str(name),
            Step::Series(members) => ("series", members),
            Step::Parallel(members) => ("parallel", members),
        };
        write!(f, "{label}(")?;
        for (i, m) in members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{m}")?;
        }
        f.write_str(")")
    }
}
