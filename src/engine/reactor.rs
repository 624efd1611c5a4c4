// src/engine/reactor.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::engine::machine::{BindingMachine, Trigger};
use crate::engine::runner::{RunResult, Runner};
use crate::engine::ReactorEvent;
use crate::errors::Result;
use crate::reload::{LiveReload, ReloadEvent};
use crate::watch::hash::{compute_file_hash, ContentHashes};
use crate::watch::WatchBinding;

/// Counters reported when the reactor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactorStats {
    /// Debounced triggers fired (task runs and reload-only broadcasts).
    pub triggers: usize,
    /// Triggered runs that finished with a failure.
    pub failures: usize,
    /// Reload notifications sent.
    pub reloads: usize,
}

/// What woke the event loop up.
enum Wake {
    Event(Option<ReactorEvent>),
    Deadline,
    Reaped(std::result::Result<(), JoinError>),
}

/// Drives one [`BindingMachine`] per watch binding from a single event
/// channel.
///
/// - `FileChanged` events are matched against every binding; all matching
///   bindings are notified.
/// - Debounce deadlines are served from the same loop.
/// - Triggered runs are spawned so a long build never blocks the loop; their
///   completion comes back as `RunFinished`.
/// - `ShutdownRequested` stops every machine once the runs already in flight
///   have finished.
pub struct Reactor {
    root: PathBuf,
    bindings: Vec<WatchBinding>,
    machines: Vec<BindingMachine>,
    runner: Arc<Runner>,
    reload: LiveReload,
    hashes: ContentHashes,
    event_tx: mpsc::Sender<ReactorEvent>,
    event_rx: mpsc::Receiver<ReactorEvent>,
    runs: JoinSet<()>,
    stats: ReactorStats,
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("root", &self.root)
            .field("bindings", &self.bindings)
            .field("in_flight", &self.runs.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Reactor {
    /// `event_tx` must be the sending half of `event_rx`; the reactor uses it
    /// to report completions of the runs it spawns.
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
        runner: Arc<Runner>,
        reload: LiveReload,
        event_tx: mpsc::Sender<ReactorEvent>,
        event_rx: mpsc::Receiver<ReactorEvent>,
    ) -> Self {
        let machines = bindings
            .iter()
            .map(|b| BindingMachine::new(b.delay(), b.triggered_while_running()))
            .collect();

        Self {
            root: root.into(),
            bindings,
            machines,
            runner,
            reload,
            hashes: ContentHashes::new(),
            event_tx,
            event_rx,
            runs: JoinSet::new(),
            stats: ReactorStats::default(),
        }
    }

    /// Main event loop. Returns after `ShutdownRequested` once every spawned
    /// run has finished.
    pub async fn run(mut self) -> Result<ReactorStats> {
        for machine in self.machines.iter_mut() {
            machine.start();
        }
        info!(bindings = self.bindings.len(), "watching for changes");

        loop {
            let next = self.next_deadline();

            let wake = tokio::select! {
                event = self.event_rx.recv() => Wake::Event(event),
                _ = sleep_until(next) => Wake::Deadline,
                Some(joined) = self.runs.join_next(), if !self.runs.is_empty() => {
                    Wake::Reaped(joined)
                }
            };

            let event = match wake {
                Wake::Deadline => {
                    self.fire_due(Instant::now());
                    continue;
                }
                Wake::Reaped(joined) => {
                    log_join_error(joined);
                    continue;
                }
                Wake::Event(Some(event)) => event,
                Wake::Event(None) => {
                    info!("reactor event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "reactor received event");

            match event {
                ReactorEvent::FileChanged { path } => self.on_file_changed(&path).await,
                ReactorEvent::RunFinished {
                    binding,
                    paths,
                    outcome,
                } => self.on_run_finished(binding, paths, outcome),
                ReactorEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping watch reactor");
                    break;
                }
            }
        }

        self.drain_in_flight().await;

        for machine in self.machines.iter_mut() {
            machine.stop();
        }

        info!(
            triggers = self.stats.triggers,
            failures = self.stats.failures,
            reloads = self.stats.reloads,
            "watch reactor stopped"
        );
        Ok(self.stats)
    }

    /// Wait for spawned runs and record their outcomes. Events other than
    /// completions are discarded; no new run is started.
    async fn drain_in_flight(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        info!(runs = self.runs.len(), "waiting for in-flight runs to finish");

        loop {
            tokio::select! {
                joined = self.runs.join_next() => match joined {
                    Some(joined) => log_join_error(joined),
                    None => break,
                },
                Some(event) = self.event_rx.recv() => self.on_drained_event(event),
            }
        }

        while let Ok(event) = self.event_rx.try_recv() {
            self.on_drained_event(event);
        }
    }

    fn on_drained_event(&mut self, event: ReactorEvent) {
        if let ReactorEvent::RunFinished {
            binding,
            paths,
            outcome,
        } = event
        {
            self.on_run_finished(binding, paths, outcome);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.machines.iter().filter_map(BindingMachine::deadline).min()
    }

    async fn on_file_changed(&mut self, path: &str) {
        let now = Instant::now();

        for idx in 0..self.bindings.len() {
            if !self.bindings[idx].matches(path) {
                continue;
            }

            if self.bindings[idx].use_hash() && !self.content_changed(idx, path).await {
                debug!(
                    binding = %self.bindings[idx].name(),
                    path,
                    "content unchanged; ignoring event"
                );
                continue;
            }

            if self.machines[idx].on_change(path, now) {
                debug!(
                    binding = %self.bindings[idx].name(),
                    path,
                    "change accepted; debouncing"
                );
            }
        }
    }

    /// Compare the file's current content hash against the last one this
    /// binding saw.
    async fn content_changed(&mut self, idx: usize, path: &str) -> bool {
        let abs = self.root.join(path);
        let hashed = tokio::task::spawn_blocking(move || compute_file_hash(&abs)).await;
        let binding = self.bindings[idx].name();

        match hashed {
            Ok(Ok(hash)) => self.hashes.update(binding, path, hash),
            Ok(Err(err)) => {
                // Usually a removal; treat as a change.
                debug!(binding = %binding, path, error = %err, "could not hash file");
                self.hashes.forget(binding, path);
                true
            }
            Err(join_err) => {
                warn!(binding = %binding, path, error = %join_err, "hashing task failed");
                true
            }
        }
    }

    fn fire_due(&mut self, now: Instant) {
        for idx in 0..self.machines.len() {
            if let Some(trigger) = self.machines[idx].poll_deadline(now) {
                self.dispatch(idx, trigger);
            }
        }
    }

    fn dispatch(&mut self, idx: usize, trigger: Trigger) {
        self.stats.triggers += 1;
        let binding = &self.bindings[idx];

        let Some(task) = binding.task() else {
            info!(
                binding = %binding.name(),
                paths = ?trigger.paths,
                "change detected; reloading"
            );
            self.broadcast(idx, trigger.paths);
            self.machines[idx].on_run_complete(Instant::now());
            return;
        };

        info!(
            binding = %binding.name(),
            task = %task,
            paths = ?trigger.paths,
            "change detected; running task"
        );

        let runner = Arc::clone(&self.runner);
        let tx = self.event_tx.clone();
        let task = task.to_string();
        let paths = trigger.paths;

        self.runs.spawn(async move {
            let outcome = runner.run(&task).await;
            let finished = ReactorEvent::RunFinished {
                binding: idx,
                paths,
                outcome,
            };
            if tx.send(finished).await.is_err() {
                debug!(task = %task, "reactor gone before run finished");
            }
        });
    }

    fn on_run_finished(&mut self, idx: usize, paths: Vec<String>, outcome: RunResult) {
        let Some(binding) = self.bindings.get(idx) else {
            warn!(binding = idx, "completion for unknown binding; ignoring");
            return;
        };

        match outcome {
            Ok(report) => {
                debug!(
                    binding = %binding.name(),
                    task = %report.task,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "triggered run succeeded"
                );
                if binding.reload() {
                    self.broadcast(idx, paths);
                }
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(
                    binding = %binding.name(),
                    error = %err,
                    "triggered run failed; still watching"
                );
            }
        }

        self.machines[idx].on_run_complete(Instant::now());
    }

    fn broadcast(&mut self, idx: usize, paths: Vec<String>) {
        let event = ReloadEvent {
            binding: self.bindings[idx].name().to_string(),
            paths,
        };
        self.reload.notify(event);
        self.stats.reloads += 1;
    }
}

fn log_join_error(joined: std::result::Result<(), JoinError>) {
    if let Err(err) = joined {
        warn!(error = %err, "spawned run panicked or was cancelled");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending::<()>().await,
    }
}
