// src/engine/mod.rs

//! Orchestration engine for assetpipe.
//!
//! This module ties together:
//! - the pipeline runner that executes tasks and composites
//! - the per-binding watch state machine (debounce, trigger, re-arm)
//! - the reactor event loop that reacts to:
//!   - file-change events from the watcher
//!   - completions of the runs it spawned
//!   - shutdown signals
//!
//! The pure state machine lives in [`machine`]; the async/IO shell around it
//! is [`reactor`].

pub mod machine;
pub mod reactor;
pub mod runner;

pub use machine::{BindingMachine, Trigger, WatchState};
pub use reactor::{Reactor, ReactorStats};
pub use runner::{RunReport, RunResult, Runner};

/// Events flowing into the reactor from the watcher, spawned runs, and the
/// Ctrl-C handler.
#[derive(Debug, Clone)]
pub enum ReactorEvent {
    /// A file changed. `path` is relative to the project root, with forward
    /// slashes.
    FileChanged { path: String },
    /// A run spawned for binding number `binding` reached a terminal state.
    RunFinished {
        binding: usize,
        paths: Vec<String>,
        outcome: RunResult,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

impl ReactorEvent {
    pub fn file_changed(path: impl Into<String>) -> Self {
        ReactorEvent::FileChanged { path: path.into() }
    }
}
