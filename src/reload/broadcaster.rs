// src/reload/broadcaster.rs

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per observer before it starts lagging.
const OBSERVER_BUFFER: usize = 16;

/// A "please refresh" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    /// Watch binding that caused the reload.
    pub binding: String,
    /// Paths (relative to the project root) that changed.
    pub paths: Vec<String>,
}

/// Fan-out of reload notifications to whoever is connected right now.
///
/// There is no backlog: an observer that subscribes after a notification
/// never sees it. Notifying with nobody connected is fine.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(OBSERVER_BUFFER);
        Self { tx }
    }

    /// Connect a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected observers.
    pub fn observers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send `event` to every connected observer; returns how many got it.
    pub fn notify(&self, event: ReloadEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => {
                debug!(observers = n, "reload notification sent");
                n
            }
            Err(_) => {
                debug!("reload notification skipped; no observers connected");
                0
            }
        }
    }
}
