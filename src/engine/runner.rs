// src/engine/runner.rs

//! Pipeline runner.
//!
//! Executes a task (or an ad-hoc [`Step`]) to a terminal state:
//!
//! - leaf: invoke the action and await it
//! - series: members strictly in order, first failure short-circuits
//! - parallel: every member is started before any is awaited, and the
//!   composite only settles once all members have settled
//!
//! Within one `run` invocation each leaf task is invoked at most once. When a
//! graph is diamond-shaped the second reference awaits the first one's
//! outcome instead of invoking the action again. Nothing is memoized across
//! invocations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info};

use crate::compose::Step;
use crate::errors::RunError;
use crate::registry::{Action, TaskKind, TaskRegistry};
use crate::types::TaskName;

/// Terminal outcome of one run.
pub type RunResult = std::result::Result<RunReport, RunError>;

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The task name, or the rendered step for ad-hoc runs.
    pub task: String,
    /// Monotonically increasing per runner.
    pub run_id: u64,
    /// How many distinct leaf actions were invoked.
    pub leaves_invoked: usize,
    pub elapsed: Duration,
}

type StepOutcome = std::result::Result<(), RunError>;
type SharedLeaf = Shared<BoxFuture<'static, StepOutcome>>;

/// Per-invocation state: the outcome of every leaf started so far.
struct RunContext {
    run_id: u64,
    leaves: Mutex<HashMap<TaskName, SharedLeaf>>,
}

impl RunContext {
    fn new(run_id: u64) -> Self {
        Self {
            run_id,
            leaves: Mutex::new(HashMap::new()),
        }
    }

    fn leaves_invoked(&self) -> usize {
        self.leaves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get the shared outcome of `name` in this run, starting the action if
    /// this is the first reference.
    fn leaf(&self, name: &str, action: &Arc<dyn Action>) -> SharedLeaf {
        let mut leaves = self.leaves.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = leaves.get(name) {
            debug!(
                task = %name,
                run_id = self.run_id,
                "task already invoked in this run; awaiting its outcome"
            );
            return existing.clone();
        }

        let action = Arc::clone(action);
        let task = name.to_string();
        let run_id = self.run_id;

        let fut = async move {
            let started = Instant::now();
            info!(task = %task, run_id, "starting task");

            match action.call().await {
                Ok(()) => {
                    info!(
                        task = %task,
                        run_id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "finished task"
                    );
                    Ok(())
                }
                Err(cause) => {
                    error!(
                        task = %task,
                        run_id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %format!("{cause:#}"),
                        "task failed"
                    );
                    Err(RunError::action(task, cause))
                }
            }
        }
        .boxed()
        .shared();

        leaves.insert(name.to_string(), fut.clone());
        fut
    }
}

/// Executes registered tasks. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Runner {
    registry: Arc<TaskRegistry>,
    run_counter: AtomicU64,
}

impl Runner {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            run_counter: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Run a registered task to completion.
    pub async fn run(&self, name: &str) -> RunResult {
        if !self.registry.contains(name) {
            return Err(RunError::UnknownTask(name.to_string()));
        }
        self.execute(name.to_string(), &Step::Task(name.to_string()))
            .await
    }

    /// Run an ad-hoc composition of registered tasks.
    pub async fn run_step(&self, step: &Step) -> RunResult {
        self.execute(step.to_string(), step).await
    }

    async fn execute(&self, label: String, step: &Step) -> RunResult {
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let ctx = RunContext::new(run_id);
        let started = Instant::now();

        debug!(task = %label, run_id, "run started");
        let outcome = self.exec_step(step, &ctx).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                let report = RunReport {
                    task: label,
                    run_id,
                    leaves_invoked: ctx.leaves_invoked(),
                    elapsed,
                };
                debug!(
                    task = %report.task,
                    run_id,
                    leaves = report.leaves_invoked,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run succeeded"
                );
                Ok(report)
            }
            Err(err) => {
                debug!(
                    task = %label,
                    run_id,
                    failed = ?err.failed_tasks(),
                    "run failed"
                );
                Err(err)
            }
        }
    }

    fn exec_step<'a>(&'a self, step: &'a Step, ctx: &'a RunContext) -> BoxFuture<'a, StepOutcome> {
        async move {
            match step {
                Step::Task(name) => self.exec_task(name, ctx).await,
                Step::Series(members) => {
                    for member in members {
                        self.exec_step(member, ctx).await?;
                    }
                    Ok(())
                }
                Step::Parallel(members) => {
                    // join_all polls every member once before waiting on any.
                    let results = join_all(members.iter().map(|m| self.exec_step(m, ctx))).await;
                    let failures: Vec<RunError> =
                        results.into_iter().filter_map(Result::err).collect();
                    if failures.is_empty() {
                        Ok(())
                    } else {
                        Err(RunError::Aggregate { failures })
                    }
                }
            }
        }
        .boxed()
    }

    async fn exec_task(&self, name: &str, ctx: &RunContext) -> StepOutcome {
        let task = self
            .registry
            .resolve(name)
            .map_err(|_| RunError::UnknownTask(name.to_string()))?;

        match task.kind() {
            TaskKind::Leaf(action) => ctx.leaf(name, action).await,
            TaskKind::Composite(step) => {
                let started = Instant::now();
                info!(task = %name, run_id = ctx.run_id, "starting task");
                let outcome = self.exec_step(step, ctx).await;
                if outcome.is_ok() {
                    info!(
                        task = %name,
                        run_id = ctx.run_id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "finished task"
                    );
                }
                outcome
            }
        }
    }
}
