// src/engine/machine.rs

//! Pure per-binding watch state machine.
//!
//! ```text
//! Idle --start--> Watching --change--> Debouncing --deadline--> Triggering
//!                    ^                   |  ^ change (re-arm)       |
//!                    |                   +--+                       |
//!                    +----------------- run complete ---------------+
//! any --stop--> Stopped
//! ```
//!
//! The machine never touches clocks, channels or tasks: the caller passes
//! `now` in and acts on what comes back. The async reactor in
//! [`crate::engine::reactor`] owns one machine per binding.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::TriggeredWhileRunning;

/// Public, read-only view of a binding's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Debouncing,
    Triggering,
    Stopped,
}

/// A coalesced trigger: fire the binding once for these paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub paths: Vec<String>,
}

#[derive(Debug)]
pub struct BindingMachine {
    state: WatchState,
    delay: Duration,
    behaviour: TriggeredWhileRunning,
    /// Set while `Debouncing`.
    deadline: Option<Instant>,
    /// Paths seen since the last trigger.
    changed: BTreeSet<String>,
    /// A change arrived during `Triggering` and should fire again afterwards.
    rerun_pending: bool,
}

impl BindingMachine {
    pub fn new(delay: Duration, behaviour: TriggeredWhileRunning) -> Self {
        Self {
            state: WatchState::Idle,
            delay,
            behaviour,
            deadline: None,
            changed: BTreeSet::new(),
            rerun_pending: false,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// When the pending debounce timer elapses, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::Debouncing => self.deadline,
            _ => None,
        }
    }

    /// `Idle -> Watching`. No-op in any other state.
    pub fn start(&mut self) {
        if self.state == WatchState::Idle {
            self.state = WatchState::Watching;
        }
    }

    /// A matching filesystem change arrived.
    ///
    /// Returns `true` if the change was accepted (it will contribute to a
    /// future trigger).
    pub fn on_change(&mut self, path: &str, now: Instant) -> bool {
        match self.state {
            WatchState::Watching | WatchState::Debouncing => {
                self.changed.insert(path.to_string());
                self.deadline = Some(now + self.delay);
                self.state = WatchState::Debouncing;
                true
            }
            WatchState::Triggering => match self.behaviour {
                TriggeredWhileRunning::Queue => {
                    self.changed.insert(path.to_string());
                    self.rerun_pending = true;
                    true
                }
                TriggeredWhileRunning::Drop => {
                    debug!(path, "change while task running; dropped");
                    false
                }
            },
            WatchState::Idle | WatchState::Stopped => false,
        }
    }

    /// Fire if the debounce deadline has passed: `Debouncing -> Triggering`.
    pub fn poll_deadline(&mut self, now: Instant) -> Option<Trigger> {
        if self.state != WatchState::Debouncing {
            return None;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.state = WatchState::Triggering;
                let paths = std::mem::take(&mut self.changed).into_iter().collect();
                Some(Trigger { paths })
            }
            _ => None,
        }
    }

    /// The triggered run finished, successfully or not:
    /// `Triggering -> Watching`, or straight back to `Debouncing` when changes
    /// were queued meanwhile.
    pub fn on_run_complete(&mut self, now: Instant) {
        if self.state != WatchState::Triggering {
            return;
        }
        if self.rerun_pending {
            self.rerun_pending = false;
            self.deadline = Some(now + self.delay);
            self.state = WatchState::Debouncing;
        } else {
            self.state = WatchState::Watching;
        }
    }

    /// Any state -> `Stopped`. Pending timers and queued changes are discarded.
    pub fn stop(&mut self) {
        self.state = WatchState::Stopped;
        self.deadline = None;
        self.changed.clear();
        self.rerun_pending = false;
    }
}
