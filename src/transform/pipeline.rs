// src/transform/pipeline.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use tracing::{debug, info};

use crate::registry::{Action, ActionFuture};
use crate::transform::sources::{match_files, MatchedPath, SourceFile};
use crate::transform::{Concat, Transform, TransformError};

/// Source globs -> transforms -> destination directory.
///
/// Each output file lands at `dest/<relative>`, where `relative` is the
/// source's path below its glob base (or whatever a transform set).
#[derive(Clone)]
pub struct FilePipeline {
    root: PathBuf,
    src: Vec<String>,
    transforms: Vec<Arc<dyn Transform>>,
    dest: PathBuf,
    newer: bool,
}

impl std::fmt::Debug for FilePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePipeline")
            .field("src", &self.src)
            .field("dest", &self.dest)
            .field("newer", &self.newer)
            .finish_non_exhaustive()
    }
}

impl FilePipeline {
    /// Pipeline without transforms: copies `src` into `dest`.
    pub fn copy(root: impl Into<PathBuf>, src: Vec<String>, dest: impl AsRef<Path>) -> Self {
        let root = root.into();
        let dest = root.join(dest);
        Self {
            root,
            src,
            transforms: Vec::new(),
            dest,
            newer: false,
        }
    }

    /// Concatenate `src` into the single file `output`.
    pub fn concat(root: impl Into<PathBuf>, src: Vec<String>, output: impl AsRef<Path>) -> Self {
        let output = output.as_ref();
        let dest = output.parent().unwrap_or(Path::new("")).to_path_buf();
        let name = output
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        Self::copy(root, src, dest).pipe(Concat::new(name))
    }

    /// Append a transform.
    pub fn pipe(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// Skip sources whose destination exists and is at least as new.
    pub fn newer(mut self, newer: bool) -> Self {
        self.newer = newer;
        self
    }

    /// Run the pipeline on the current thread. Returns the number of files
    /// written.
    pub fn run_blocking(&self) -> Result<usize, TransformError> {
        let mut matched = match_files(&self.root, &self.src)?;
        let found = matched.len();

        if self.newer {
            matched.retain(|m| self.is_newer(m));
            debug!(
                found,
                changed = matched.len(),
                dest = %self.dest.display(),
                "filtered sources by modification time"
            );
        }

        let mut files = matched
            .into_iter()
            .map(SourceFile::load)
            .collect::<Result<Vec<_>, _>>()?;

        for transform in &self.transforms {
            files = transform.apply(files)?;
        }

        for file in &files {
            let target = self.dest.join(&file.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| TransformError::io(parent, e))?;
            }
            fs::write(&target, &file.contents).map_err(|e| TransformError::io(&target, e))?;
        }

        Ok(files.len())
    }

    fn is_newer(&self, matched: &MatchedPath) -> bool {
        let target = self.dest.join(&matched.relative);
        match (modified(&matched.path), modified(&target)) {
            (Some(src), Some(dst)) => src > dst,
            _ => true,
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Action for FilePipeline {
    fn call(&self) -> ActionFuture<'_> {
        let job = self.clone();
        Box::pin(async move {
            let dest = job.dest.clone();
            let written = tokio::task::spawn_blocking(move || job.run_blocking())
                .await
                .context("file pipeline worker stopped unexpectedly")??;
            info!(written, dest = %dest.display(), "wrote files");
            Ok(())
        })
    }

    fn describe(&self) -> String {
        let mut out = format!("{} -> {}", self.src.join(", "), self.dest.display());
        for t in &self.transforms {
            out.push_str(" | ");
            out.push_str(&t.name());
        }
        if self.newer {
            out.push_str(" (newer only)");
        }
        out
    }
}
