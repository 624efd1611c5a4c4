// src/transform/sources.rs

//! Source glob expansion.
//!
//! Rules:
//! - Patterns are relative to the project root and evaluated in order.
//! - `!pattern` removes matches from every positive pattern.
//! - Within one pattern, matches come in file-name order, directory by
//!   directory. A file matched by several patterns is kept at its first
//!   position.
//! - Each match carries its path relative to the pattern's glob base, which
//!   is where it lands under a destination directory.
//! - A pattern without glob characters must name an existing file.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use walkdir::WalkDir;

use crate::globs::{build_globset, glob_base, has_glob_chars, normalize, split_negation};
use crate::transform::TransformError;
use crate::watch::path_utils::relative_str;

/// A path selected by a source pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPath {
    /// Location on disk.
    pub path: PathBuf,
    /// Location relative to the pattern's glob base.
    pub relative: PathBuf,
}

/// A file loaded into memory on its way through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    /// In-memory file that does not exist on disk yet.
    pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let relative = relative.into();
        Self {
            path: relative.clone(),
            relative,
            contents: contents.into(),
        }
    }

    pub fn load(matched: MatchedPath) -> Result<Self, TransformError> {
        let contents =
            fs::read(&matched.path).map_err(|source| TransformError::io(&matched.path, source))?;
        Ok(Self {
            path: matched.path,
            relative: matched.relative,
            contents,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct MatchOptions {
    include_dirs: bool,
    allow_missing: bool,
}

/// Expand source patterns into files.
pub fn match_files(root: &Path, patterns: &[String]) -> Result<Vec<MatchedPath>, TransformError> {
    match_entries(
        root,
        patterns,
        MatchOptions {
            include_dirs: false,
            allow_missing: false,
        },
    )
}

/// Expand patterns into files and directories; missing literal paths are
/// skipped.
pub(crate) fn match_paths(
    root: &Path,
    patterns: &[String],
) -> Result<Vec<MatchedPath>, TransformError> {
    match_entries(
        root,
        patterns,
        MatchOptions {
            include_dirs: true,
            allow_missing: true,
        },
    )
}

fn match_entries(
    root: &Path,
    patterns: &[String],
    opts: MatchOptions,
) -> Result<Vec<MatchedPath>, TransformError> {
    let mut positives = Vec::new();
    let mut negated = Vec::new();
    for pattern in patterns {
        match split_negation(pattern) {
            (true, rest) => negated.push(normalize(rest)),
            (false, rest) => positives.push(normalize(rest)),
        }
    }

    let exclude = if negated.is_empty() {
        None
    } else {
        Some(compile(&negated)?)
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in &positives {
        for matched in match_one(root, pattern, opts)? {
            let excluded = exclude.as_ref().is_some_and(|set| {
                relative_str(root, &matched.path).is_some_and(|rel| set.is_match(rel))
            });
            if excluded {
                continue;
            }
            if seen.insert(matched.path.clone()) {
                out.push(matched);
            }
        }
    }
    Ok(out)
}

fn match_one(
    root: &Path,
    pattern: &str,
    opts: MatchOptions,
) -> Result<Vec<MatchedPath>, TransformError> {
    if !has_glob_chars(pattern) {
        return match_literal(root, pattern, opts);
    }

    let base = glob_base(pattern);
    let base_dir = if base == Path::new(".") {
        root.to_path_buf()
    } else {
        root.join(&base)
    };
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let set = compile(&[pattern.to_string()])?;
    let mut out = Vec::new();

    for entry in WalkDir::new(&base_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(&base_dir, err))?;
        let file_type = entry.file_type();
        if !(file_type.is_file() || (opts.include_dirs && file_type.is_dir())) {
            continue;
        }
        let Some(rel) = relative_str(root, entry.path()) else {
            continue;
        };
        if !set.is_match(&rel) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&base_dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        out.push(MatchedPath {
            path: entry.into_path(),
            relative,
        });
    }
    Ok(out)
}

fn match_literal(
    root: &Path,
    pattern: &str,
    opts: MatchOptions,
) -> Result<Vec<MatchedPath>, TransformError> {
    let path = root.join(pattern);
    let relative = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(pattern));

    if path.is_file() || (opts.include_dirs && path.is_dir()) {
        return Ok(vec![MatchedPath { path, relative }]);
    }
    if opts.allow_missing {
        return Ok(Vec::new());
    }
    Err(TransformError::io(
        &path,
        io::Error::new(io::ErrorKind::NotFound, "no file matches this path"),
    ))
}

fn compile(patterns: &[String]) -> Result<GlobSet, TransformError> {
    build_globset(patterns)
        .map_err(|err| TransformError::malformed(patterns.join(", "), format!("{err:#}")))
}

fn walk_error(base_dir: &Path, err: walkdir::Error) -> TransformError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop while walking sources"));
    TransformError::io(path, source)
}
