// src/transform/clean.rs

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};

use crate::globs::{has_glob_chars, normalize};
use crate::registry::{Action, ActionFuture};
use crate::transform::sources::match_paths;
use crate::transform::TransformError;

/// Delete every file and directory matched by `patterns`.
///
/// Matches are removed deepest first. A matched directory that still holds
/// unmatched (e.g. negated) entries is left in place. A pattern without glob
/// characters naming a directory removes the whole tree. Nothing matching is
/// not an error.
#[derive(Debug, Clone)]
pub struct Clean {
    root: PathBuf,
    patterns: Vec<String>,
}

impl Clean {
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            patterns,
        }
    }

    /// Delete on the current thread; returns the number of removed entries.
    pub fn run_blocking(&self) -> Result<usize, TransformError> {
        let mut matched = match_paths(&self.root, &self.patterns)?;
        matched.sort_by_key(|m| std::cmp::Reverse(m.path.components().count()));

        let literal_dirs: Vec<PathBuf> = self
            .patterns
            .iter()
            .filter(|p| !p.trim().starts_with('!'))
            .filter(|p| !has_glob_chars(p))
            .map(|p| self.root.join(normalize(p)))
            .collect();

        let mut removed = 0;
        for m in matched {
            let result = if m.path.is_dir() {
                if literal_dirs.contains(&m.path) {
                    fs::remove_dir_all(&m.path)
                } else {
                    fs::remove_dir(&m.path)
                }
            } else {
                fs::remove_file(&m.path)
            };

            match result {
                Ok(()) => {
                    debug!(path = %m.path.display(), "removed");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                    debug!(path = %m.path.display(), "kept non-empty directory");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(TransformError::io(&m.path, e)),
            }
        }
        Ok(removed)
    }
}

impl Action for Clean {
    fn call(&self) -> ActionFuture<'_> {
        let job = self.clone();
        Box::pin(async move {
            let removed = tokio::task::spawn_blocking(move || job.run_blocking())
                .await
                .context("clean worker stopped unexpectedly")??;
            info!(removed, "cleaned");
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("clean {}", self.patterns.join(", "))
    }
}
