use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::ReactorEvent;
use crate::globs::glob_base;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle deregisters every notification.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    dirs: Vec<PathBuf>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Directories registered with the OS watcher.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

/// Spawn a filesystem watcher for the given bindings and forward every
/// change under `root` to the reactor as `ReactorEvent::FileChanged`.
///
/// - `root` is the project root against which all glob patterns are evaluated.
/// - Only the glob base directories of the bindings are watched (recursively),
///   so output directories outside of them do not generate noise.
/// - Matching against bindings happens in the reactor; this side only
///   relativizes paths.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: &[WatchBinding],
    reactor_tx: mpsc::Sender<ReactorEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // Not much to do from inside the notify thread.
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    let dirs = watch_dirs(&root, bindings);
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", dir.display()))?;
        info!(dir = %dir.display(), "watching directory");
    }

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths {
                let Some(rel) = relative_str(&async_root, &path) else {
                    warn!(
                        "could not relativize path {:?} against root {:?}",
                        path, async_root
                    );
                    continue;
                };
                if reactor_tx
                    .send(ReactorEvent::FileChanged { path: rel })
                    .await
                    .is_err()
                {
                    debug!("reactor channel closed; watcher forwarding stopped");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        dirs,
    })
}

/// Directories to register for `bindings`: the glob base of every pattern,
/// moved up to the nearest existing ancestor under `root`, with nested
/// directories removed (a recursive watch on the parent covers them).
pub fn watch_dirs(root: &Path, bindings: &[WatchBinding]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = bindings
        .iter()
        .flat_map(|b| b.globs().iter())
        .map(|g| existing_ancestor(root, &root.join(glob_base(g))))
        .collect();

    candidates.sort();
    candidates.dedup();

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if !dirs.iter().any(|kept| dir.starts_with(kept)) {
            dirs.push(dir);
        }
    }
    dirs
}

fn existing_ancestor(root: &Path, dir: &Path) -> PathBuf {
    let mut current = dir.to_path_buf();
    while !current.is_dir() && current != root {
        match current.parent() {
            Some(parent) if parent.starts_with(root) => current = parent.to_path_buf(),
            _ => return root.to_path_buf(),
        }
    }
    current
}
