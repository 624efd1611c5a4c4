// src/transform/mod.rs

//! Built-in leaf actions and the transform capability.
//!
//! - [`sources`] expands source globs into files, gulp.src style.
//! - [`pipeline`] reads sources, runs them through [`Transform`]s and writes
//!   the results to a destination directory.
//! - [`concat`] is the built-in content transform.
//! - [`clean`] deletes matched paths.
//! - [`command`] runs a shell command.
//!
//! Content transforms (CSS, JS, images) are plugged in from outside by
//! implementing [`Transform`]; none ship here.

pub mod clean;
pub mod command;
pub mod concat;
pub mod pipeline;
pub mod sources;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use clean::Clean;
pub use command::CommandAction;
pub use concat::Concat;
pub use pipeline::FilePipeline;
pub use sources::{match_files, MatchedPath, SourceFile};

/// Errors raised while reading, transforming or writing files.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Input could not be processed (bad pattern, bad content, bad output name).
    #[error("malformed input {}: {reason}", file.display())]
    Malformed { file: PathBuf, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransformError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        TransformError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn malformed(file: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        TransformError::Malformed {
            file: file.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// A content transform: a batch of files in, a batch of files out.
///
/// Transforms run on a blocking worker thread, so they may do synchronous
/// work. Output files keep (or set) their `relative` path; the pipeline
/// writes each one to `dest/relative`.
pub trait Transform: Send + Sync {
    fn apply(&self, files: Vec<SourceFile>) -> Result<Vec<SourceFile>, TransformError>;

    /// Name shown in `--dry-run` output.
    fn name(&self) -> String;
}
